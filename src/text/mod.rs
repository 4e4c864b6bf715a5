//! Text pipeline: raw text → tokens, phrases and duplicate checks
//!
//! Everything here is deterministic and free of registry access; the
//! recency filter is the only stateful piece.

mod dedup;
mod phrases;
mod tokenize;

pub use dedup::{hash_text, RecentFilter, DEFAULT_CAPACITY, DEFAULT_WINDOW_MS};
pub use phrases::{extract_phrases, Phrase, MAX_PHRASES};
pub use tokenize::{canonicalize, normalize, tokenize, CanonicalPair, MIN_TOKEN_LEN, STOPWORDS};
