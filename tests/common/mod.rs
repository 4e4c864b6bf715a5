//! Shared helpers for live-session integration tests

#![allow(dead_code)]

use mindmap::{LiveGraph, MindmapConfig, MockService, SignalKind};
use std::collections::HashMap;
use std::sync::Arc;

/// A short planning meeting, one segment per line
pub const MEETING: &[&str] = &[
    "Let's start with the pricing model for the new subscription tier",
    "The sales team wants pricing that undercuts the competition",
    "Marketing thinks the launch date should move to October",
    "If the launch moves we need to tell the support team early",
    "Support is already stretched because of the onboarding backlog",
    "Onboarding improvements could reduce churn on the subscription tier",
    "So pricing, launch date and onboarding are the three open items",
];

/// Defaults with the enrichment cool-down disabled so tests can enrich back to back
pub fn test_config() -> MindmapConfig {
    let mut config = MindmapConfig::default();
    config.enrichment.guard_window_ms = 0;
    config
}

pub fn live_with(service: MockService) -> (LiveGraph, Arc<MockService>) {
    let service = Arc::new(service);
    let live = LiveGraph::new(test_config()).with_service(service.clone());
    (live, service)
}

/// Ingest every line as a final segment at a fixed timestamp.
pub fn ingest_all(live: &LiveGraph, lines: &[&str]) {
    for line in lines {
        live.ingest_at(line, SignalKind::Final, 0);
    }
}

/// Concept id → weight for every concept in the session
pub fn weights(live: &LiveGraph) -> HashMap<String, f64> {
    live.graph().read(|g| {
        g.concepts()
            .map(|c| (c.id.as_str().to_string(), c.weight))
            .collect()
    })
}

pub fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
}
