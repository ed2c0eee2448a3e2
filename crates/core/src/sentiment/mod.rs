use crate::config::{ScorerKind, Settings};
use std::sync::Arc;

pub mod keywords;
pub mod lexicon;
pub mod tone;

pub use lexicon::LexiconScorer;
pub use tone::ToneClassifierScorer;

/// Maps text to a signed sentiment in `[-1, 1]`, `0` meaning neutral.
///
/// Implementations fail closed: internal errors are logged and scored as `0`
/// so a bad article can never abort a pipeline run.
#[async_trait::async_trait]
pub trait SentimentScorer: Send + Sync {
    fn scorer_name(&self) -> &'static str;

    async fn score(&self, text: &str) -> f64;
}

pub fn build_scorer(settings: &Settings) -> anyhow::Result<Arc<dyn SentimentScorer>> {
    let scorer: Arc<dyn SentimentScorer> = match settings.scorer {
        ScorerKind::Lexicon => Arc::new(LexiconScorer::new()),
        ScorerKind::Tone => Arc::new(ToneClassifierScorer::from_settings(settings)?),
    };
    tracing::info!(scorer = scorer.scorer_name(), "sentiment scorer selected");
    Ok(scorer)
}
