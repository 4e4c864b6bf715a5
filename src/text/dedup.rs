//! Approximate recency filter for near-identical inputs
//!
//! A time-bounded cache keyed by a cheap 32-bit rolling hash. Collisions
//! between distinct texts are reported as duplicates; that false-positive
//! risk buys O(1) checks and bounded memory.

use crate::graph::Timestamp;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Default duplicate window.
pub const DEFAULT_WINDOW_MS: i64 = 1000;

/// Default maximum number of remembered hashes.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Entries older than `SWEEP_FACTOR × window` are swept on insert.
const SWEEP_FACTOR: i64 = 10;

/// `h = h * 31 + unit` over UTF-16 code units, wrapping at 32 bits.
pub fn hash_text(text: &str) -> u32 {
    text.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit)))
        as u32
}

/// Remembers when each text hash was last accepted.
#[derive(Debug)]
pub struct RecentFilter {
    window_ms: i64,
    capacity: usize,
    seen: DashMap<u32, Timestamp>,
}

impl RecentFilter {
    pub fn new(window_ms: i64) -> Self {
        Self::with_capacity(window_ms, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(window_ms: i64, capacity: usize) -> Self {
        Self {
            window_ms: window_ms.max(0),
            capacity: capacity.max(1),
            seen: DashMap::new(),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// True when the same hash was accepted less than `window_ms` before `now`.
    ///
    /// A duplicate does not refresh the stored timestamp. Anything else is
    /// recorded at `now`, followed by a sweep of stale entries.
    pub fn is_duplicate(&self, text: &str, now: Timestamp) -> bool {
        let hash = hash_text(text);
        {
            match self.seen.entry(hash) {
                Entry::Occupied(mut entry) => {
                    if now - *entry.get() < self.window_ms {
                        return true;
                    }
                    entry.insert(now);
                }
                Entry::Vacant(entry) => {
                    entry.insert(now);
                }
            }
        }
        self.sweep(now);
        false
    }

    /// Drop expired entries, then the oldest ones while over capacity.
    fn sweep(&self, now: Timestamp) {
        let horizon = self.window_ms.saturating_mul(SWEEP_FACTOR);
        self.seen.retain(|_, seen_at| now - *seen_at <= horizon);

        while self.seen.len() > self.capacity {
            let oldest = self
                .seen
                .iter()
                .min_by_key(|entry| *entry.value())
                .map(|entry| *entry.key());
            match oldest {
                Some(hash) => {
                    self.seen.remove(&hash);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&self) {
        self.seen.clear();
    }
}

impl Default for RecentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sight_then_duplicate_then_expired() {
        let filter = RecentFilter::new(1000);
        assert!(!filter.is_duplicate("hello world", 0));
        assert!(filter.is_duplicate("hello world", 500));
        assert!(filter.is_duplicate("hello world", 999));
        assert!(!filter.is_duplicate("hello world", 1000));
    }

    #[test]
    fn duplicate_does_not_refresh_timestamp() {
        let filter = RecentFilter::new(1000);
        assert!(!filter.is_duplicate("again", 0));
        assert!(filter.is_duplicate("again", 900));
        // Measured from the first acceptance at 0, not the duplicate at 900.
        assert!(!filter.is_duplicate("again", 1100));
    }

    #[test]
    fn distinct_texts_are_independent() {
        let filter = RecentFilter::new(1000);
        assert!(!filter.is_duplicate("pricing", 0));
        assert!(!filter.is_duplicate("strategy", 10));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn stale_entries_are_swept_on_insert() {
        let filter = RecentFilter::new(100);
        filter.is_duplicate("old", 0);
        filter.is_duplicate("new", 1001);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let filter = RecentFilter::with_capacity(1000, 2);
        filter.is_duplicate("one", 0);
        filter.is_duplicate("two", 1);
        filter.is_duplicate("three", 2);

        assert_eq!(filter.len(), 2);
        assert!(!filter.is_duplicate("one", 3), "oldest entry was evicted");
    }

    #[test]
    fn hash_matches_rolling_definition() {
        assert_eq!(hash_text(""), 0);
        assert_eq!(hash_text("a"), 97);
        assert_eq!(hash_text("ab"), 97 * 31 + 98);
    }
}
