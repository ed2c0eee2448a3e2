use crate::domain::recommendation::SymbolRecommendation;
use crate::storage::RecommendationStore;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryRecommendationStore {
    rows: RwLock<BTreeMap<String, SymbolRecommendation>>,
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait::async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn get(&self, symbol: &str) -> anyhow::Result<Option<SymbolRecommendation>> {
        Ok(self.rows.read().await.get(symbol).cloned())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<SymbolRecommendation>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn upsert(&self, rec: &SymbolRecommendation) -> anyhow::Result<()> {
        anyhow::ensure!(!rec.symbol.trim().is_empty(), "symbol must be non-empty");

        let mut row = rec.clone();
        row.updated_at = Some(chrono::Utc::now());
        self.rows.write().await.insert(row.symbol.clone(), row);
        Ok(())
    }
}
