use std::collections::HashMap;

pub const MAX_KEYWORDS: usize = 5;

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "and", "are", "but", "can", "could", "for", "from", "had", "has",
    "have", "her", "his", "its", "into", "more", "not", "now", "one", "our", "out", "over",
    "said", "says", "she", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "those", "was", "were", "what", "when", "which", "while", "who", "will",
    "with", "would", "year", "you", "your",
];

pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, token) in tokenize(text).enumerate() {
        if token.len() < 3
            || token.chars().all(|c| c.is_ascii_digit())
            || STOPWORDS.contains(&token.as_str())
        {
            continue;
        }
        counts.entry(token).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));

    ranked.into_iter().take(limit).map(|(w, _, _)| w).collect()
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
