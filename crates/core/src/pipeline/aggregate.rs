use crate::domain::article::ScoredArticle;

pub fn aggregate(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

pub fn supporting_article(articles: &[ScoredArticle]) -> Option<&ScoredArticle> {
    let mut best: Option<&ScoredArticle> = None;
    for article in articles {
        match best {
            Some(b) if article.sentiment.abs() <= b.sentiment.abs() => {}
            _ => best = Some(article),
        }
    }
    best
}
