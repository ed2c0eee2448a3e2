use crate::config::Settings;
use crate::domain::article::NewsItem;
use crate::error::FetchError;
use crate::news::types::ProviderNewsItem;
use crate::time::window::format_date;
use anyhow::Context;
use chrono::NaiveDate;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://finnhub.io";
const DEFAULT_PATH: &str = "/api/v1/company-news";
pub const MAX_ITEMS: usize = 10;

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    // At most the first `MAX_ITEMS`, in provider order, for the inclusive window.
    async fn fetch_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FinnhubNewsProvider {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl FinnhubNewsProvider {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let token = settings.require_finnhub_api_key()?.to_string();
        let base_url = settings
            .news_provider_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self::new(base_url, token, settings.news_provider_timeout)
    }

    pub fn new(base_url: String, token: String, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!timeout.is_zero(), "news provider timeout must be non-zero");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build news provider http client")?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), DEFAULT_PATH)
    }
}

#[async_trait::async_trait]
impl NewsProvider for FinnhubNewsProvider {
    fn provider_name(&self) -> &'static str {
        "finnhub"
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let res = self
            .http
            .get(self.url())
            .query(&[
                ("symbol", symbol.to_string()),
                ("from", format_date(from)),
                ("to", format_date(to)),
                ("token", self.token.clone()),
            ])
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status { status, body: text });
        }

        let parsed = serde_json::from_str::<Vec<ProviderNewsItem>>(&text)?;
        let total = parsed.len();
        let items: Vec<NewsItem> = parsed
            .into_iter()
            .take(MAX_ITEMS)
            .map(NewsItem::from)
            .collect();

        tracing::debug!(
            %symbol,
            %from,
            %to,
            total,
            kept = items.len(),
            "fetched company news"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dead_url, serve};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn provider(base_url: String) -> FinnhubNewsProvider {
        FinnhubNewsProvider::new(base_url, "test-token".to_string(), Duration::from_secs(5)).unwrap()
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 27).unwrap(),
        )
    }

    #[tokio::test]
    async fn sends_query_and_truncates_to_first_ten_items() {
        let router = Router::new().route(
            "/api/v1/company-news",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("symbol").map(String::as_str), Some("AAPL"));
                assert_eq!(q.get("from").map(String::as_str), Some("2026-01-26"));
                assert_eq!(q.get("to").map(String::as_str), Some("2026-01-27"));
                assert_eq!(q.get("token").map(String::as_str), Some("test-token"));

                let items: Vec<Value> = (0..15)
                    .map(|i| {
                        json!({
                            "headline": format!("headline {i}"),
                            "summary": format!("summary {i}"),
                            "url": format!("https://example.com/{i}"),
                            "datetime": 1769472000 + i,
                        })
                    })
                    .collect();
                Json(Value::Array(items))
            }),
        );
        let base = serve(router).await;

        let (from, to) = window();
        let items = provider(base).fetch_news("AAPL", from, to).await.unwrap();
        assert_eq!(items.len(), 10);
        assert_eq!(items[0].headline, "headline 0");
        assert_eq!(items[9].article_url, "https://example.com/9");
    }

    #[tokio::test]
    async fn missing_and_null_fields_become_empty_strings() {
        let router = Router::new().route(
            "/api/v1/company-news",
            get(|| async { Json(json!([{"headline": "only a headline", "summary": null}])) }),
        );
        let base = serve(router).await;

        let (from, to) = window();
        let items = provider(base).fetch_news("AAPL", from, to).await.unwrap();
        assert_eq!(
            items,
            vec![NewsItem {
                headline: "only a headline".to_string(),
                summary: String::new(),
                article_url: String::new(),
            }]
        );
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let router = Router::new().route(
            "/api/v1/company-news",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(router).await;

        let (from, to) = window();
        let err = provider(base).fetch_news("MSFT", from, to).await.unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_timeout() {
        let res = FinnhubNewsProvider::new(
            "http://localhost".to_string(),
            "t".to_string(),
            Duration::ZERO,
        );
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let (from, to) = window();
        let err = provider(dead_url().await)
            .fetch_news("MSFT", from, to)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn non_array_body_is_a_decode_error() {
        let router = Router::new().route(
            "/api/v1/company-news",
            get(|| async { Json(json!({"error": "You don't have access to this resource."})) }),
        );
        let base = serve(router).await;

        let (from, to) = window();
        let err = provider(base).fetch_news("AAPL", from, to).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
