use crate::sentiment::SentimentScorer;
use vader_sentiment::SentimentIntensityAnalyzer;

pub struct LexiconScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    pub fn polarity(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let scores = self.analyzer.polarity_scores(text);
        let compound = scores.get("compound").copied().unwrap_or(0.0);
        if compound.is_finite() {
            compound.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SentimentScorer for LexiconScorer {
    fn scorer_name(&self) -> &'static str {
        "lexicon"
    }

    async fn score(&self, text: &str) -> f64 {
        self.polarity(text)
    }
}
