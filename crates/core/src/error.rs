use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("news provider HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("news provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("news provider response is not a news item list: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("failed to fetch news for {symbol}: {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to persist recommendation for {symbol}: {error:#}")]
    Persist { symbol: String, error: anyhow::Error },

    #[error("failed to read cached recommendation for {symbol}: {error:#}")]
    Store { symbol: String, error: anyhow::Error },
}

impl AnalyzeError {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Fetch { symbol, .. } | Self::Persist { symbol, .. } | Self::Store { symbol, .. } => {
                symbol
            }
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}
