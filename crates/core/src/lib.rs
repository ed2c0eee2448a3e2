pub mod domain;
pub mod error;
pub mod news;
pub mod pipeline;
pub mod schedule;
pub mod sentiment;
pub mod storage;
pub mod time;

#[cfg(test)]
pub(crate) mod test_support;

pub mod config {
    use crate::domain::portfolio::PortfolioEntry;
    use anyhow::Context;
    use std::str::FromStr;
    use std::time::Duration;

    const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 2 * 60 * 60;
    const DEFAULT_NEWS_PROVIDER_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_ARTICLE_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_TONE_CLASSIFIER_TIMEOUT_SECS: u64 = 30;

    // Governs single-symbol `analyze` when the store already holds a row.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum CachePolicy {
        CacheFirst,
        #[default]
        AlwaysRefresh,
    }

    impl FromStr for CachePolicy {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "cache-first" | "cache_first" => Ok(Self::CacheFirst),
                "always-refresh" | "always_refresh" => Ok(Self::AlwaysRefresh),
                other => anyhow::bail!(
                    "unknown CACHE_POLICY {other:?} (expected cache-first or always-refresh)"
                ),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ScorerKind {
        #[default]
        Lexicon,
        Tone,
    }

    impl FromStr for ScorerKind {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "lexicon" => Ok(Self::Lexicon),
                "tone" | "finbert" => Ok(Self::Tone),
                other => {
                    anyhow::bail!("unknown SENTIMENT_SCORER {other:?} (expected lexicon or tone)")
                }
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub finnhub_api_key: Option<String>,
        pub news_provider_base_url: Option<String>,
        pub tone_classifier_url: Option<String>,
        pub tone_classifier_token: Option<String>,
        pub scorer: ScorerKind,
        pub cache_policy: CachePolicy,
        pub refresh_interval: Duration,
        pub news_provider_timeout: Duration,
        pub article_timeout: Duration,
        pub tone_classifier_timeout: Duration,
        pub portfolio: Vec<PortfolioEntry>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let scorer = match std::env::var("SENTIMENT_SCORER") {
                Ok(s) if !s.trim().is_empty() => s.parse()?,
                _ => ScorerKind::default(),
            };

            let cache_policy = match std::env::var("CACHE_POLICY") {
                Ok(s) if !s.trim().is_empty() => s.parse()?,
                _ => CachePolicy::default(),
            };

            let refresh_interval =
                secs_from_env("REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL_SECS)?;
            let news_provider_timeout =
                secs_from_env("NEWS_PROVIDER_TIMEOUT_SECS", DEFAULT_NEWS_PROVIDER_TIMEOUT_SECS)?;
            let article_timeout =
                secs_from_env("ARTICLE_FETCH_TIMEOUT_SECS", DEFAULT_ARTICLE_TIMEOUT_SECS)?;
            let tone_classifier_timeout = secs_from_env(
                "TONE_CLASSIFIER_TIMEOUT_SECS",
                DEFAULT_TONE_CLASSIFIER_TIMEOUT_SECS,
            )?;

            let portfolio = match std::env::var("PORTFOLIO") {
                Ok(s) if !s.trim().is_empty() => parse_portfolio(&s)?,
                _ => default_portfolio(),
            };

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                finnhub_api_key: std::env::var("FINNHUB_API_KEY").ok(),
                news_provider_base_url: std::env::var("NEWS_PROVIDER_BASE_URL").ok(),
                tone_classifier_url: std::env::var("TONE_CLASSIFIER_URL").ok(),
                tone_classifier_token: std::env::var("TONE_CLASSIFIER_TOKEN").ok(),
                scorer,
                cache_policy,
                refresh_interval,
                news_provider_timeout,
                article_timeout,
                tone_classifier_timeout,
                portfolio,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_finnhub_api_key(&self) -> anyhow::Result<&str> {
            self.finnhub_api_key
                .as_deref()
                .context("FINNHUB_API_KEY is required")
        }

        pub fn symbols(&self) -> Vec<String> {
            self.portfolio.iter().map(|p| p.symbol.clone()).collect()
        }
    }

    fn secs_from_env(name: &str, default: u64) -> anyhow::Result<Duration> {
        parse_secs(name, std::env::var(name).ok().as_deref(), default)
    }

    pub fn parse_secs(name: &str, raw: Option<&str>, default: u64) -> anyhow::Result<Duration> {
        let secs = match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s
                .parse::<u64>()
                .with_context(|| format!("{name} is not a number: {s}"))?,
            None => default,
        };
        anyhow::ensure!(secs >= 1, "{name} must be >= 1");
        Ok(Duration::from_secs(secs))
    }

    pub fn default_portfolio() -> Vec<PortfolioEntry> {
        vec![
            PortfolioEntry::new("Apple Inc.", "AAPL"),
            PortfolioEntry::new("Microsoft Corporation", "MSFT"),
            PortfolioEntry::new("Google LLC", "GOOGL"),
        ]
    }

    /// Parses `SYMBOL=Name,SYMBOL=Name`. A bare `SYMBOL` uses the symbol as its name.
    pub fn parse_portfolio(s: &str) -> anyhow::Result<Vec<PortfolioEntry>> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (symbol, name) = match part.split_once('=') {
                Some((symbol, name)) => (symbol.trim(), name.trim()),
                None => (part, part),
            };
            anyhow::ensure!(!symbol.is_empty(), "empty symbol in PORTFOLIO entry {part:?}");
            let name = if name.is_empty() { symbol } else { name };

            out.push(PortfolioEntry::new(name, &symbol.to_ascii_uppercase()));
        }

        anyhow::ensure!(!out.is_empty(), "PORTFOLIO must list at least one symbol");
        Ok(out)
    }

}
