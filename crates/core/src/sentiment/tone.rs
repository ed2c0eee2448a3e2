use crate::config::Settings;
use crate::sentiment::SentimentScorer;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_URL: &str =
    "https://api-inference.huggingface.co/models/yiyanghkust/finbert-tone";

// The model sees at most 512 tokens; trimming on our side keeps requests small.
const MAX_INPUT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneLabel {
    pub label: String,
    pub score: f64,
}

pub fn tone_to_score(label: &str, confidence: f64) -> f64 {
    if !confidence.is_finite() {
        return 0.0;
    }
    let confidence = confidence.clamp(0.0, 1.0);
    match label.trim().to_ascii_lowercase().as_str() {
        "positive" => confidence,
        "negative" => -confidence,
        _ => 0.0,
    }
}

#[derive(Debug, Clone)]
pub struct ToneClassifierScorer {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

// Endpoints answer either `[{..}, ..]` or `[[{..}, ..]]` depending on batching.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<ToneLabel>>),
    Flat(Vec<ToneLabel>),
}

impl InferenceResponse {
    fn into_labels(self) -> Vec<ToneLabel> {
        match self {
            Self::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            Self::Flat(labels) => labels,
        }
    }
}

impl ToneClassifierScorer {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let url = settings
            .tone_classifier_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        Self::new(
            url,
            settings.tone_classifier_token.clone(),
            settings.tone_classifier_timeout,
        )
    }

    pub fn new(url: String, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!timeout.is_zero(), "tone classifier timeout must be non-zero");
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build tone classifier http client")?;
        Ok(Self { http, url, token })
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        Ok(headers)
    }

    pub async fn classify(&self, text: &str) -> anyhow::Result<ToneLabel> {
        let inputs = truncate_chars(text, MAX_INPUT_CHARS);
        let res = self
            .http
            .post(&self.url)
            .headers(self.headers()?)
            .json(&InferenceRequest { inputs })
            .send()
            .await
            .context("tone classifier request failed")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("failed to read tone classifier response")?;
        anyhow::ensure!(status.is_success(), "tone classifier HTTP {status}: {body}");

        let parsed = serde_json::from_str::<InferenceResponse>(&body)
            .with_context(|| format!("unexpected tone classifier response: {body}"))?;

        parsed
            .into_labels()
            .into_iter()
            .filter(|l| l.score.is_finite())
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .context("tone classifier returned no labels")
    }
}

#[async_trait::async_trait]
impl SentimentScorer for ToneClassifierScorer {
    fn scorer_name(&self) -> &'static str {
        "tone"
    }

    async fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        match self.classify(text).await {
            Ok(tone) => tone_to_score(&tone.label, tone.score),
            Err(err) => {
                tracing::warn!(error = %err, "tone classifier failed; scoring neutral");
                0.0
            }
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
