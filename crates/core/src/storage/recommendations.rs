use crate::domain::recommendation::{Recommendation, SymbolRecommendation};
use crate::storage::RecommendationStore;
use anyhow::Context;
use chrono::{DateTime, Utc};

type Row = (
    String,
    String,
    f64,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

#[derive(Debug, Clone)]
pub struct PgRecommendationStore {
    pool: sqlx::PgPool,
}

impl PgRecommendationStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn get(&self, symbol: &str) -> anyhow::Result<Option<SymbolRecommendation>> {
        let row = sqlx::query_as::<_, Row>(
            "SELECT symbol, recommendation, sentiment, article_title, article_url, updated_at \
             FROM stock_recommendations \
             WHERE symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("select stock_recommendations failed (symbol={symbol})"))?;

        row.map(from_row).transpose()
    }

    async fn get_all(&self) -> anyhow::Result<Vec<SymbolRecommendation>> {
        let rows = sqlx::query_as::<_, Row>(
            "SELECT symbol, recommendation, sentiment, article_title, article_url, updated_at \
             FROM stock_recommendations \
             ORDER BY symbol ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("select all stock_recommendations failed")?;

        rows.into_iter().map(from_row).collect()
    }

    async fn upsert(&self, rec: &SymbolRecommendation) -> anyhow::Result<()> {
        anyhow::ensure!(!rec.symbol.trim().is_empty(), "symbol must be non-empty");

        sqlx::query(
            "INSERT INTO stock_recommendations \
               (symbol, recommendation, sentiment, article_title, article_url, updated_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             ON CONFLICT (symbol) DO UPDATE \
               SET recommendation = EXCLUDED.recommendation, \
                   sentiment = EXCLUDED.sentiment, \
                   article_title = EXCLUDED.article_title, \
                   article_url = EXCLUDED.article_url, \
                   updated_at = EXCLUDED.updated_at",
        )
        .bind(&rec.symbol)
        .bind(rec.recommendation.as_str())
        .bind(rec.sentiment)
        .bind(&rec.article_title)
        .bind(&rec.article_url)
        .execute(&self.pool)
        .await
        .with_context(|| format!("upsert stock_recommendations failed (symbol={})", rec.symbol))?;

        Ok(())
    }
}

fn from_row(row: Row) -> anyhow::Result<SymbolRecommendation> {
    let (symbol, recommendation, sentiment, article_title, article_url, updated_at) = row;
    let recommendation = recommendation
        .parse::<Recommendation>()
        .with_context(|| format!("invalid recommendation in DB for symbol={symbol}"))?;

    Ok(SymbolRecommendation {
        symbol,
        recommendation,
        sentiment,
        article_title,
        article_url,
        updated_at: Some(updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> PgRecommendationStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        crate::storage::migrate(&pool).await.unwrap();
        PgRecommendationStore::new(pool)
    }

    #[test]
    fn maps_rows_and_rejects_unknown_labels() {
        let now = Utc::now();
        let rec = from_row((
            "AAPL".to_string(),
            "Strong Buy".to_string(),
            0.7,
            Some("t".to_string()),
            None,
            now,
        ))
        .unwrap();
        assert_eq!(rec.recommendation, Recommendation::StrongBuy);
        assert_eq!(rec.updated_at, Some(now));

        let bad = from_row(("AAPL".to_string(), "Maybe".to_string(), 0.0, None, None, now));
        assert!(bad.is_err());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn upsert_overwrites_every_field() {
        let store = store().await;
        let r1 = SymbolRecommendation {
            symbol: "TT_TEST_OVERWRITE".to_string(),
            recommendation: Recommendation::StrongBuy,
            sentiment: 0.9,
            article_title: Some("old title".to_string()),
            article_url: Some("https://example.com/old".to_string()),
            updated_at: None,
        };
        let r2 = SymbolRecommendation {
            recommendation: Recommendation::Sell,
            sentiment: -0.3,
            article_title: None,
            article_url: None,
            ..r1.clone()
        };

        store.upsert(&r1).await.unwrap();
        store.upsert(&r1).await.unwrap();
        assert!(store.get(&r1.symbol).await.unwrap().unwrap().same_content(&r1));

        store.upsert(&r2).await.unwrap();
        let got = store.get(&r2.symbol).await.unwrap().unwrap();
        assert!(got.same_content(&r2));

        let all = store.get_all().await.unwrap();
        assert_eq!(all.iter().filter(|r| r.symbol == r2.symbol).count(), 1);
    }
}
