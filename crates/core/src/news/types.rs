use crate::domain::article::NewsItem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderNewsItem {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<ProviderNewsItem> for NewsItem {
    fn from(item: ProviderNewsItem) -> Self {
        Self {
            headline: item.headline.unwrap_or_default().trim().to_string(),
            summary: item.summary.unwrap_or_default().trim().to_string(),
            article_url: item.url.unwrap_or_default().trim().to_string(),
        }
    }
}
