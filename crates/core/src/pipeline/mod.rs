use crate::config::{CachePolicy, Settings};
use crate::domain::article::ScoredArticle;
use crate::domain::recommendation::{classify, Recommendation, SymbolRecommendation};
use crate::error::{AnalyzeError, FetchError};
use crate::news::extract::ArticleExtractor;
use crate::news::provider::{FinnhubNewsProvider, NewsProvider};
use crate::sentiment::keywords::{extract_keywords, MAX_KEYWORDS};
use crate::sentiment::{build_scorer, SentimentScorer};
use crate::storage::lock::try_acquire_refresh_lock;
use crate::storage::RecommendationStore;
use crate::time::window::news_window;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod aggregate;

use aggregate::{aggregate, supporting_article};

// Only `Fetching` can lead to `Failed`; later stages degrade instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Extracting,
    Scoring,
    Aggregating,
    Classifying,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Scoring => "scoring",
            Self::Aggregating => "aggregating",
            Self::Classifying => "classifying",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub recommendation: Recommendation,
    pub sentiment: f64,
    pub articles: Vec<ScoredArticle>,
}

impl AnalysisReport {
    pub fn to_recommendation(&self) -> SymbolRecommendation {
        let support = supporting_article(&self.articles);
        SymbolRecommendation {
            symbol: self.symbol.clone(),
            recommendation: self.recommendation,
            sentiment: self.sentiment,
            article_title: support
                .map(|a| a.article.title.clone())
                .filter(|s| !s.is_empty()),
            article_url: support
                .map(|a| a.article.url.clone())
                .filter(|s| !s.is_empty()),
            updated_at: None,
        }
    }
}

pub struct Pipeline {
    news: Arc<dyn NewsProvider>,
    extractor: ArticleExtractor,
    scorer: Arc<dyn SentimentScorer>,
    store: Arc<dyn RecommendationStore>,
    cache_policy: CachePolicy,
    // Serialises batch refreshes started from any trigger in this process.
    refresh_lock: Mutex<()>,
    // When set, batches also take the Postgres advisory lock.
    refresh_pool: Option<sqlx::PgPool>,
}

impl Pipeline {
    pub fn new(
        news: Arc<dyn NewsProvider>,
        extractor: ArticleExtractor,
        scorer: Arc<dyn SentimentScorer>,
        store: Arc<dyn RecommendationStore>,
        cache_policy: CachePolicy,
    ) -> Self {
        Self {
            news,
            extractor,
            scorer,
            store,
            cache_policy,
            refresh_lock: Mutex::new(()),
            refresh_pool: None,
        }
    }

    pub fn with_refresh_lock(mut self, pool: sqlx::PgPool) -> Self {
        self.refresh_pool = Some(pool);
        self
    }

    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn RecommendationStore>,
    ) -> anyhow::Result<Self> {
        let news = Arc::new(FinnhubNewsProvider::from_settings(settings)?);
        let extractor = ArticleExtractor::from_settings(settings)?;
        let scorer = build_scorer(settings)?;
        Ok(Self::new(
            news,
            extractor,
            scorer,
            store,
            settings.cache_policy,
        ))
    }

    pub async fn analyze_report(&self, symbol: &str) -> Result<AnalysisReport, FetchError> {
        let symbol = normalize_symbol(symbol);
        let (from, to) = news_window(chrono::Utc::now());

        enter(&symbol, Stage::Fetching);
        let items = match self.news.fetch_news(&symbol, from, to).await {
            Ok(items) => items,
            Err(err) => {
                enter(&symbol, Stage::Failed);
                return Err(err);
            }
        };

        enter(&symbol, Stage::Extracting);
        let mut enriched = Vec::with_capacity(items.len());
        for item in &items {
            enriched.push(self.extractor.extract(item).await);
        }

        enter(&symbol, Stage::Scoring);
        let mut articles = Vec::with_capacity(enriched.len());
        for article in enriched {
            let sentiment = self.scorer.score(&article.content).await;
            let keywords = extract_keywords(&article.content, MAX_KEYWORDS);
            articles.push(ScoredArticle {
                article,
                sentiment,
                keywords,
            });
        }

        enter(&symbol, Stage::Aggregating);
        let scores: Vec<f64> = articles.iter().map(|a| a.sentiment).collect();
        let sentiment = aggregate(&scores);

        enter(&symbol, Stage::Classifying);
        let recommendation = classify(sentiment);

        Ok(AnalysisReport {
            symbol,
            recommendation,
            sentiment,
            articles,
        })
    }

    pub async fn analyze(&self, symbol: &str) -> Result<SymbolRecommendation, AnalyzeError> {
        self.analyze_with_policy(symbol, self.cache_policy).await
    }

    async fn analyze_with_policy(
        &self,
        symbol: &str,
        policy: CachePolicy,
    ) -> Result<SymbolRecommendation, AnalyzeError> {
        let symbol = normalize_symbol(symbol);

        if policy == CachePolicy::CacheFirst {
            let cached = self
                .store
                .get(&symbol)
                .await
                .map_err(|error| AnalyzeError::Store {
                    symbol: symbol.clone(),
                    error,
                })?;
            if let Some(rec) = cached {
                tracing::debug!(%symbol, "serving cached recommendation");
                return Ok(rec);
            }
        }

        let report = self
            .analyze_report(&symbol)
            .await
            .map_err(|source| AnalyzeError::Fetch {
                symbol: symbol.clone(),
                source,
            })?;
        let rec = report.to_recommendation();

        enter(&symbol, Stage::Persisting);
        self.store
            .upsert(&rec)
            .await
            .map_err(|error| AnalyzeError::Persist {
                symbol: symbol.clone(),
                error,
            })?;

        enter(&symbol, Stage::Done);
        tracing::info!(
            %symbol,
            recommendation = %rec.recommendation,
            sentiment = rec.sentiment,
            articles = report.articles.len(),
            "recommendation persisted"
        );
        Ok(rec)
    }

    /// Recomputes every symbol in order, waiting for any refresh already
    /// running in this process. Symbols that fail are logged and left out.
    /// `None` means another process holds the refresh lock.
    pub async fn refresh_all(&self, symbols: &[String]) -> Option<Vec<SymbolRecommendation>> {
        let _local = self.refresh_lock.lock().await;
        self.run_exclusive(symbols).await
    }

    pub async fn try_refresh_all(&self, symbols: &[String]) -> Option<Vec<SymbolRecommendation>> {
        let _local = self.refresh_lock.try_lock().ok()?;
        self.run_exclusive(symbols).await
    }

    async fn run_exclusive(&self, symbols: &[String]) -> Option<Vec<SymbolRecommendation>> {
        let Some(pool) = &self.refresh_pool else {
            return Some(self.run_batch(symbols).await);
        };

        let guard = match try_acquire_refresh_lock(pool).await {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                tracing::warn!("refresh lock held by another process; skipping refresh");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh lock unavailable; skipping refresh");
                return None;
            }
        };

        let out = self.run_batch(symbols).await;
        if let Err(err) = guard.release().await {
            tracing::warn!(error = %err, "failed to release refresh lock");
        }
        Some(out)
    }

    async fn run_batch(&self, symbols: &[String]) -> Vec<SymbolRecommendation> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            // A batch refresh always recomputes; the cache policy only
            // governs single-symbol requests.
            match self
                .analyze_with_policy(symbol, CachePolicy::AlwaysRefresh)
                .await
            {
                Ok(rec) => out.push(rec),
                Err(err) => {
                    tracing::warn!(symbol = %err.symbol(), error = %err, "skipping symbol in refresh");
                }
            }
        }

        tracing::info!(
            requested = symbols.len(),
            refreshed = out.len(),
            "refresh finished"
        );
        out
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

fn enter(symbol: &str, stage: Stage) {
    tracing::debug!(%symbol, %stage, "pipeline stage");
}
