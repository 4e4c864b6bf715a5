//! SharedGraph: reader–writer access to one registry
//!
//! Every mutation runs to completion under the write lock, so readers never
//! observe a partially applied update. Closures must not await; the lock is
//! never held across a suspension point.

use super::registry::ConceptGraph;
use std::sync::{Arc, PoisonError, RwLock};

/// A cloneable handle to a single registry instance.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<ConceptGraph>>,
}

impl SharedGraph {
    pub fn new(graph: ConceptGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Run `f` with shared read access.
    pub fn read<R>(&self, f: impl FnOnce(&ConceptGraph) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run `f` with exclusive access.
    pub fn write<R>(&self, f: impl FnOnce(&mut ConceptGraph) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Swap in a new registry, returning the previous one.
    pub fn replace(&self, graph: ConceptGraph) -> ConceptGraph {
        self.write(|current| std::mem::replace(current, graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConceptOptions, SourceKind};
    use std::thread;

    #[test]
    fn clones_share_one_registry() {
        let shared = SharedGraph::default();
        let other = shared.clone();

        shared.write(|g| {
            g.upsert_concept_at("sales", ConceptOptions::default(), 0);
        });
        assert_eq!(other.read(|g| g.concept_count()), 1);
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let shared = SharedGraph::default();
        shared.write(|g| {
            g.upsert_concept_at("hub", ConceptOptions::default(), 0);
        });

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        shared.write(|g| {
                            g.touch_concept("hub", 1.0, i);
                            g.upsert_edge("hub", &format!("spoke-{}", i), 1.0, SourceKind::Cooccur, i);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared.read(|g| {
            assert_eq!(g.concept("hub").unwrap().weight, 800.0);
            assert_eq!(g.edge_count(), 8);
            assert!(g.edges().all(|e| e.weight == 100.0));
        });
    }
}
