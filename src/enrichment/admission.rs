//! Admission control for enrichment calls
//!
//! At most one call in flight, a cool-down after each successful call, and a
//! minimum amount of input text. The Idle → Pending transition happens in
//! the same critical section as the check, and the returned permit restores
//! Idle when dropped, whatever path the caller leaves by.

use crate::graph::Timestamp;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_MIN_TEXT_LEN: usize = 50;
pub const DEFAULT_GUARD_WINDOW_MS: i64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPhase {
    Idle,
    Pending,
}

#[derive(Debug)]
struct GuardState {
    phase: AdmissionPhase,
    /// Time of the last successful completion
    last_completed: Option<Timestamp>,
}

fn lock(state: &Mutex<GuardState>) -> MutexGuard<'_, GuardState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-flight + cool-down + minimum-input gate
#[derive(Debug, Clone)]
pub struct AdmissionGuard {
    state: Arc<Mutex<GuardState>>,
    min_text_len: usize,
    guard_window_ms: i64,
}

impl AdmissionGuard {
    pub fn new(min_text_len: usize, guard_window_ms: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(GuardState {
                phase: AdmissionPhase::Idle,
                last_completed: None,
            })),
            min_text_len,
            guard_window_ms,
        }
    }

    fn admissible(&self, state: &GuardState, recent_text: &str, now: Timestamp) -> bool {
        if state.phase == AdmissionPhase::Pending {
            return false;
        }
        if recent_text.chars().count() < self.min_text_len {
            return false;
        }
        match state.last_completed {
            Some(last) => now - last >= self.guard_window_ms,
            None => true,
        }
    }

    /// Whether a call started at `now` would be admitted
    pub fn should_analyze(&self, recent_text: &str, now: Timestamp) -> bool {
        let state = lock(&self.state);
        self.admissible(&state, recent_text, now)
    }

    /// Check and move to Pending atomically.
    ///
    /// Returns `None` when the call is not admitted; the phase is unchanged.
    pub fn try_admit(&self, recent_text: &str, now: Timestamp) -> Option<PendingPermit> {
        let mut state = lock(&self.state);
        if !self.admissible(&state, recent_text, now) {
            return None;
        }
        state.phase = AdmissionPhase::Pending;
        Some(PendingPermit {
            state: Arc::clone(&self.state),
        })
    }

    pub fn phase(&self) -> AdmissionPhase {
        lock(&self.state).phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase() == AdmissionPhase::Pending
    }

    pub fn last_completed(&self) -> Option<Timestamp> {
        lock(&self.state).last_completed
    }
}

impl Default for AdmissionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TEXT_LEN, DEFAULT_GUARD_WINDOW_MS)
    }
}

/// Proof that the holder owns the single in-flight slot.
///
/// Dropping the permit returns the guard to Idle. Only
/// [`complete`](PendingPermit::complete) starts a new cool-down.
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the slot"]
pub struct PendingPermit {
    state: Arc<Mutex<GuardState>>,
}

impl PendingPermit {
    /// Record a successful completion at `now` and release the slot.
    pub fn complete(self, now: Timestamp) {
        lock(&self.state).last_completed = Some(now);
    }
}

impl Drop for PendingPermit {
    fn drop(&mut self) {
        lock(&self.state).phase = AdmissionPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        "pricing strategy and the sales pipeline for next quarter".to_string()
    }

    #[test]
    fn short_text_is_rejected() {
        let guard = AdmissionGuard::default();
        assert!(!guard.should_analyze("too short", 10_000));
        assert!(guard.try_admit("too short", 10_000).is_none());
        assert_eq!(guard.phase(), AdmissionPhase::Idle);
    }

    #[test]
    fn first_call_is_admitted_without_prior_completion() {
        let guard = AdmissionGuard::default();
        assert!(guard.should_analyze(&long_text(), 0));
    }

    #[test]
    fn single_flight() {
        let guard = AdmissionGuard::default();
        let permit = guard.try_admit(&long_text(), 0).unwrap();

        assert!(guard.is_pending());
        assert!(!guard.should_analyze(&long_text(), 100_000));
        assert!(guard.try_admit(&long_text(), 100_000).is_none());

        drop(permit);
        assert!(!guard.is_pending());
    }

    #[test]
    fn cool_down_after_success() {
        let guard = AdmissionGuard::default();
        guard.try_admit(&long_text(), 0).unwrap().complete(1000);

        assert_eq!(guard.last_completed(), Some(1000));
        assert!(!guard.should_analyze(&long_text(), 3999));
        assert!(guard.should_analyze(&long_text(), 4000));
    }

    #[test]
    fn failure_releases_without_cool_down() {
        let guard = AdmissionGuard::default();
        guard.try_admit(&long_text(), 0).unwrap().complete(1000);

        let permit = guard.try_admit(&long_text(), 5000).unwrap();
        drop(permit);

        assert_eq!(guard.phase(), AdmissionPhase::Idle);
        assert_eq!(guard.last_completed(), Some(1000), "failure leaves the last completion");
        assert!(guard.should_analyze(&long_text(), 5001));
    }

    #[test]
    fn panic_while_pending_releases() {
        let guard = AdmissionGuard::default();
        let shared = guard.clone();
        let text = long_text();

        let result = std::thread::spawn(move || {
            let _permit = shared.try_admit(&text, 0).unwrap();
            panic!("boom");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(guard.phase(), AdmissionPhase::Idle);
    }

    #[test]
    fn length_counts_characters() {
        let guard = AdmissionGuard::new(5, 0);
        assert!(guard.should_analyze("ééééé", 0));
        assert!(!guard.should_analyze("éééé", 0));
    }
}
