use crate::domain::recommendation::SymbolRecommendation;
use anyhow::Context;

pub mod lock;
pub mod memory;
pub mod recommendations;

pub use memory::InMemoryRecommendationStore;
pub use recommendations::PgRecommendationStore;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

#[async_trait::async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn get(&self, symbol: &str) -> anyhow::Result<Option<SymbolRecommendation>>;

    async fn get_all(&self) -> anyhow::Result<Vec<SymbolRecommendation>>;

    /// Atomically inserts or fully replaces the row for `rec.symbol`.
    /// Absent supporting-article fields overwrite earlier values with nothing.
    async fn upsert(&self, rec: &SymbolRecommendation) -> anyhow::Result<()>;
}
