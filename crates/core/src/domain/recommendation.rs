use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    Buy,
    Hold,
    Sell,
    #[serde(rename = "Strong Sell")]
    StrongSell,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "Strong Buy",
            Self::Buy => "Buy",
            Self::Hold => "Hold",
            Self::Sell => "Sell",
            Self::StrongSell => "Strong Sell",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Ok(match normalized.as_str() {
            "strongbuy" => Self::StrongBuy,
            "buy" => Self::Buy,
            "hold" => Self::Hold,
            "sell" => Self::Sell,
            "strongsell" => Self::StrongSell,
            _ => bail!("unknown recommendation label: {s:?}"),
        })
    }
}

/// Maps an aggregate sentiment to a label. Thresholds are strict, so a value
/// sitting on a boundary lands in the lower bucket. NaN falls through to
/// `StrongSell`.
pub fn classify(sentiment: f64) -> Recommendation {
    if sentiment > 0.5 {
        Recommendation::StrongBuy
    } else if sentiment > 0.1 {
        Recommendation::Buy
    } else if sentiment > -0.1 {
        Recommendation::Hold
    } else if sentiment > -0.5 {
        Recommendation::Sell
    } else {
        Recommendation::StrongSell
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecommendation {
    pub symbol: String,
    pub recommendation: Recommendation,
    pub sentiment: f64,
    pub article_title: Option<String>,
    pub article_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SymbolRecommendation {
    pub fn same_content(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.recommendation == other.recommendation
            && self.sentiment == other.sentiment
            && self.article_title == other.article_title
            && self.article_url == other.article_url
    }
}
