use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tickertone_core::domain::portfolio::PortfolioEntry;
use tickertone_core::domain::recommendation::SymbolRecommendation;
use tickertone_core::error::AnalyzeError;
use tickertone_core::pipeline::Pipeline;
use tickertone_core::storage::RecommendationStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Option<Arc<Pipeline>>,
    pub store: Option<Arc<dyn RecommendationStore>>,
    pub portfolio: Arc<Vec<PortfolioEntry>>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub symbol: Option<String>,
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/portfolio", get(list_portfolio))
        .route("/analyze/:symbol", get(analyze_symbol))
        .route("/refresh", post(refresh_all))
        .route("/calculate-recommendations", get(calculate_recommendations))
        .route("/dashboard", get(list_cached))
        .route("/recommendations", get(list_cached))
        .route("/recommendations/:symbol", get(get_cached))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_portfolio(State(state): State<AppState>) -> Json<Vec<PortfolioEntry>> {
    Json(state.portfolio.as_ref().clone())
}

async fn analyze_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<SymbolRecommendation> {
    let pipeline = require_pipeline(&state)?;
    pipeline.analyze(&symbol).await.map(Json).map_err(|err| {
        let status = if err.is_fetch() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        tracing::warn!(%symbol, error = %err, "analysis failed");
        (status, Json(api_error(&err)))
    })
}

async fn refresh_all(State(state): State<AppState>) -> ApiResult<Vec<SymbolRecommendation>> {
    let pipeline = require_pipeline(&state)?;
    let symbols = symbols(&state);
    pipeline
        .refresh_all(&symbols)
        .await
        .map(Json)
        .ok_or_else(refresh_in_progress)
}

#[derive(Debug, Serialize)]
struct RefreshStatus {
    status: &'static str,
}

async fn calculate_recommendations(State(state): State<AppState>) -> ApiResult<RefreshStatus> {
    let pipeline = require_pipeline(&state)?;
    let symbols = symbols(&state);
    pipeline
        .refresh_all(&symbols)
        .await
        .ok_or_else(refresh_in_progress)?;
    Ok(Json(RefreshStatus {
        status: "Recommendations updated.",
    }))
}

async fn list_cached(State(state): State<AppState>) -> ApiResult<Vec<SymbolRecommendation>> {
    let store = require_store(&state)?;
    store.get_all().await.map(Json).map_err(|e| {
        tracing::error!(error = %e, "list recommendations failed");
        internal(None, &e)
    })
}

async fn get_cached(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<SymbolRecommendation> {
    let store = require_store(&state)?;
    let symbol = symbol.trim().to_ascii_uppercase();
    match store.get(&symbol).await {
        Ok(Some(rec)) => Ok(Json(rec)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                symbol: Some(symbol),
                error: "no recommendation cached".to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!(%symbol, error = %e, "get recommendation failed");
            Err(internal(Some(symbol), &e))
        }
    }
}

fn symbols(state: &AppState) -> Vec<String> {
    state.portfolio.iter().map(|p| p.symbol.clone()).collect()
}

fn require_pipeline(state: &AppState) -> Result<&Arc<Pipeline>, (StatusCode, Json<ApiError>)> {
    state.pipeline.as_ref().ok_or_else(unavailable)
}

fn require_store(
    state: &AppState,
) -> Result<&Arc<dyn RecommendationStore>, (StatusCode, Json<ApiError>)> {
    state.store.as_ref().ok_or_else(unavailable)
}

fn unavailable() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiError {
            symbol: None,
            error: "service running in degraded mode".to_string(),
        }),
    )
}

fn refresh_in_progress() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::CONFLICT,
        Json(ApiError {
            symbol: None,
            error: "refresh already in progress".to_string(),
        }),
    )
}

fn internal(symbol: Option<String>, e: &anyhow::Error) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            symbol,
            error: format!("{e:#}"),
        }),
    )
}

fn api_error(err: &AnalyzeError) -> ApiError {
    let error = match err {
        AnalyzeError::Fetch { .. } => "Failed to fetch news data".to_string(),
        other => other.to_string(),
    };
    ApiError {
        symbol: Some(err.symbol().to_string()),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{self, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use serde_json::Value;
    use std::time::Duration;
    use tickertone_core::config::{default_portfolio, CachePolicy};
    use tickertone_core::domain::article::NewsItem;
    use tickertone_core::domain::recommendation::Recommendation;
    use tickertone_core::error::FetchError;
    use tickertone_core::news::extract::ArticleExtractor;
    use tickertone_core::news::provider::NewsProvider;
    use tickertone_core::sentiment::SentimentScorer;
    use tickertone_core::storage::InMemoryRecommendationStore;
    use tower::ServiceExt as _;

    const BODY_LIMIT: usize = 1024 * 1024;

    // AAPL and GOOGL have news; anything else fails like a provider 500.
    struct FakeNews;

    #[async_trait::async_trait]
    impl NewsProvider for FakeNews {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_news(
            &self,
            symbol: &str,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<NewsItem>, FetchError> {
            let summaries: &[&str] = match symbol {
                "AAPL" => &["up", "flat"],
                "GOOGL" => &["down"],
                _ => {
                    return Err(FetchError::Status {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        body: "simulated".to_string(),
                    })
                }
            };
            Ok(summaries
                .iter()
                .map(|s| NewsItem {
                    headline: format!("{symbol} {s}"),
                    summary: s.to_string(),
                    article_url: String::new(),
                })
                .collect())
        }
    }

    struct FakeScorer;

    #[async_trait::async_trait]
    impl SentimentScorer for FakeScorer {
        fn scorer_name(&self) -> &'static str {
            "fake"
        }

        async fn score(&self, text: &str) -> f64 {
            match text {
                "up" => 0.6,
                "flat" => 0.4,
                "down" => -0.6,
                _ => 0.0,
            }
        }
    }

    fn pipeline(store: Arc<InMemoryRecommendationStore>) -> Pipeline {
        Pipeline::new(
            Arc::new(FakeNews),
            ArticleExtractor::new(Duration::from_secs(1)).unwrap(),
            Arc::new(FakeScorer),
            store,
            CachePolicy::AlwaysRefresh,
        )
    }

    fn state() -> (AppState, Arc<InMemoryRecommendationStore>) {
        let store = Arc::new(InMemoryRecommendationStore::new());
        let pipeline = pipeline(store.clone());
        let state = AppState {
            pipeline: Some(Arc::new(pipeline)),
            store: Some(store.clone()),
            portfolio: Arc::new(default_portfolio()),
        };
        (state, store)
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn portfolio_lists_configured_symbols() {
        let (state, _) = state();
        let (status, body) = call(router(state), "GET", "/portfolio").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["symbol"], "AAPL");
        assert_eq!(body[0]["name"], "Apple Inc.");
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn analyze_returns_and_persists_recommendation() {
        let (state, store) = state();
        let (status, body) = call(router(state), "GET", "/analyze/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"], "Buy");
        assert_eq!(body["sentiment"], 0.5);

        let stored = store.get("AAPL").await.unwrap().unwrap();
        assert_eq!(stored.recommendation, Recommendation::Buy);
    }

    #[tokio::test]
    async fn analyze_fetch_failure_is_bad_gateway() {
        let (state, store) = state();
        let (status, body) = call(router(state), "GET", "/analyze/MSFT").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["symbol"], "MSFT");
        assert_eq!(body["error"], "Failed to fetch news data");
        assert!(store.get("MSFT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_returns_partial_results_and_dashboard_lists_them() {
        let (state, _) = state();
        let app = router(state);

        let (status, body) = call(app.clone(), "POST", "/refresh").await;
        assert_eq!(status, StatusCode::OK);
        let symbols: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["symbol"].as_str().unwrap())
            .collect();
        assert_eq!(symbols, vec!["AAPL", "GOOGL"]);

        let (status, body) = call(app.clone(), "GET", "/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = call(app, "GET", "/recommendations/googl").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"], "Strong Sell");
    }

    #[tokio::test]
    async fn legacy_trigger_reports_status() {
        let (state, store) = state();
        let (status, body) = call(router(state), "GET", "/calculate-recommendations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Recommendations updated.");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn refresh_is_conflict_when_the_refresh_lock_is_unavailable() {
        let store = Arc::new(InMemoryRecommendationStore::new());
        let lock_pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(300))
            .connect_lazy("postgres://tickertone@127.0.0.1:1/tickertone")
            .unwrap();
        let state = AppState {
            pipeline: Some(Arc::new(pipeline(store.clone()).with_refresh_lock(lock_pool))),
            store: Some(store.clone()),
            portfolio: Arc::new(default_portfolio()),
        };
        let app = router(state);

        let (status, body) = call(app.clone(), "POST", "/refresh").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "refresh already in progress");

        let (status, _) = call(app, "GET", "/calculate-recommendations").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_cached_symbol_is_not_found() {
        let (state, _) = state();
        let (status, _) = call(router(state), "GET", "/recommendations/TSLA").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn degraded_mode_is_service_unavailable() {
        let state = AppState {
            pipeline: None,
            store: None,
            portfolio: Arc::new(default_portfolio()),
        };
        let app = router(state);

        let (status, _) = call(app.clone(), "GET", "/analyze/AAPL").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = call(app.clone(), "GET", "/dashboard").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = call(app, "GET", "/healthz").await;
        assert_eq!(status, StatusCode::OK);
    }
}
