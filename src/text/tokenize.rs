//! Normalization, tokenization and canonicalization

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Tokens shorter than this are dropped.
pub const MIN_TOKEN_LEN: usize = 3;

/// Common English function words filtered out of every token stream.
pub const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "for", "on", "with", "at", "by",
    "is", "are", "be", "we", "you", "i", "it", "that", "this", "as", "our", "your",
    "from", "about", "was", "were", "have", "has", "had", "will", "would", "can",
    "could", "should", "they", "them", "their", "but", "if", "not", "so", "what",
    "which", "who", "where", "when", "why", "how", "all", "each", "few", "more",
    "most", "other", "some", "than", "these", "those", "both", "does", "did", "do",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s'-]").expect("static pattern"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

fn token_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9'-]+").expect("static pattern"))
}

/// Lowercase, blank out everything but word characters, whitespace,
/// apostrophes and hyphens, then collapse whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let blanked = non_word().replace_all(&lowered, " ");
    whitespace_run().replace_all(&blanked, " ").trim().to_string()
}

/// Split text into content tokens.
///
/// Keeps alphanumeric/apostrophe/hyphen runs of at least three characters
/// that are not stopwords. Order and repeats are preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    token_run()
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN && !stopwords().contains(token))
        .map(str::to_string)
        .collect()
}

/// A normalized item paired with the alias it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPair {
    pub canonical: String,
    pub alias: String,
}

/// Lowercase, trim and deduplicate items, dropping anything shorter than
/// three characters. First-seen order is kept.
///
/// Every surviving item is its own alias; synonym resolution would hook in here.
pub fn canonicalize<I, S>(items: I) -> Vec<CanonicalPair>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    for item in items {
        let normalized = item.as_ref().trim().to_lowercase();
        if normalized.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        if seen.insert(normalized.clone()) {
            pairs.push(CanonicalPair {
                canonical: normalized.clone(),
                alias: normalized,
            });
        }
    }

    pairs
}
