//! Sliding-window phrase extraction

use std::collections::HashMap;

/// Maximum number of phrases returned.
pub const MAX_PHRASES: usize = 10;

/// A phrase and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub phrase: String,
    pub score: usize,
}

/// Count contiguous `window_size`-token windows and return the ten most
/// frequent, ties broken by first occurrence.
///
/// Phrases of three characters or fewer are skipped.
pub fn extract_phrases<S: AsRef<str>>(tokens: &[S], window_size: usize) -> Vec<Phrase> {
    if window_size == 0 || tokens.len() < window_size {
        return Vec::new();
    }

    let mut order: Vec<Phrase> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for window in tokens.windows(window_size) {
        let phrase = window.iter().map(|t| t.as_ref()).collect::<Vec<_>>().join(" ");
        if phrase.chars().count() <= 3 {
            continue;
        }
        match index.get(&phrase) {
            Some(&i) => order[i].score += 1,
            None => {
                index.insert(phrase.clone(), order.len());
                order.push(Phrase { phrase, score: 1 });
            }
        }
    }

    // Stable sort keeps first-occurrence order among equal scores.
    order.sort_by(|a, b| b.score.cmp(&a.score));
    order.truncate(MAX_PHRASES);
    order
}
