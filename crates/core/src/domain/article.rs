use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub summary: String,
    pub article_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    pub title: String,
    pub content: String,
    pub url: String,
}

impl EnrichedArticle {
    pub fn fallback(item: &NewsItem) -> Self {
        Self {
            title: item.headline.clone(),
            content: item.summary.clone(),
            url: item.article_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: EnrichedArticle,
    pub sentiment: f64,
    pub keywords: Vec<String>,
}
