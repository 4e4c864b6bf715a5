//! Serialization tests with export-format fixtures

use serde_json::{json, Value};

/// Fixture: a concept as written by the export feature
fn export_node_fixture() -> Value {
    json!({
        "id": "sales strategy",
        "canonical_label": "Sales Strategy",
        "aliases": ["sales strategy", "go-to-market"],
        "type": "topic",
        "weight": 5.8,
        "last_seen_at": 1732000000000i64,
        "pruned": false
    })
}

/// Fixture: an edge with mixed provenance
fn export_edge_fixture() -> Value {
    json!({
        "id": "pricing|sales strategy",
        "source": "pricing",
        "target": "sales strategy",
        "weight": 3.5,
        "last_seen_at": 1732000000500i64,
        "provenance": { "cooccur": 1.5, "ai": 2.0, "sim": 0 }
    })
}

/// Fixture: a full snapshot
fn export_snapshot_fixture() -> Value {
    json!({
        "exportedAt": "2025-11-30T10:00:00Z",
        "segments": [
            {
                "id": "seg-0",
                "text": "Our pricing shapes the sales strategy",
                "tokens": ["pricing", "shapes", "sales", "strategy"],
                "createdAt": 1732000000000i64
            }
        ],
        "nodes": [export_node_fixture()],
        "edges": [export_edge_fixture()]
    })
}

#[cfg(test)]
mod serialization_tests {
    use super::*;
    use crate::graph::{
        Concept, ConceptGraph, ConceptId, ConceptOptions, ConceptType, Edge, SourceKind, Snapshot,
    };

    #[test]
    fn concept_id_serializes_as_string() {
        let id = ConceptId::normalized("Sales Strategy");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sales strategy\"");
    }

    #[test]
    fn concept_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ConceptType::Entity).unwrap(), "\"entity\"");
        let ct: ConceptType = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(ct, ConceptType::Other);
    }

    #[test]
    fn source_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SourceKind::Cooccur).unwrap(), "\"cooccur\"");
        assert_eq!(SourceKind::Sim.as_str(), "sim");
    }

    #[test]
    fn serialized_concept_uses_export_field_names() {
        let concept = Concept::new("Pricing", &ConceptOptions::default(), 10);
        let json = serde_json::to_value(&concept).unwrap();

        assert_eq!(json["id"], "pricing");
        assert_eq!(json["canonical_label"], "Pricing");
        assert_eq!(json["type"], "topic");
        assert!(json["aliases"].is_array());
        assert!(json["weight"].is_number());
        assert_eq!(json["last_seen_at"], 10);
        assert_eq!(json["pruned"], false);
        assert!(json.get("concept_type").is_none());
    }

    #[test]
    fn serialized_edge_has_provenance_map() {
        let mut edge = Edge::new("b", "a", 0);
        edge.reinforce(1.0, SourceKind::Ai, 5);
        let json = serde_json::to_value(&edge).unwrap();

        assert_eq!(json["id"], "a|b");
        assert_eq!(json["source"], "a");
        assert_eq!(json["target"], "b");
        assert_eq!(json["provenance"]["ai"], 1.0);
        assert_eq!(json["provenance"]["cooccur"], 0.0);
        assert_eq!(json["provenance"]["sim"], 0.0);
    }

    #[test]
    fn can_deserialize_export_node_fixture() {
        let result: Result<Concept, _> = serde_json::from_value(export_node_fixture());
        assert!(result.is_ok(), "failed to deserialize node fixture: {:?}", result.err());

        let concept = result.unwrap();
        assert_eq!(concept.id.as_str(), "sales strategy");
        assert_eq!(concept.aliases.len(), 2);
        assert_eq!(concept.weight, 5.8);
    }

    #[test]
    fn can_deserialize_export_edge_fixture() {
        let result: Result<Edge, _> = serde_json::from_value(export_edge_fixture());
        assert!(result.is_ok(), "failed to deserialize edge fixture: {:?}", result.err());

        let edge = result.unwrap();
        assert_eq!(edge.provenance.cooccur, 1.5);
        assert_eq!(edge.provenance.ai, 2.0);
        assert!(!edge.pruned, "pruned defaults to false when absent");
    }

    #[test]
    fn can_restore_export_snapshot_fixture() {
        let snapshot: Snapshot = serde_json::from_value(export_snapshot_fixture()).unwrap();
        let graph = ConceptGraph::from_snapshot(snapshot).unwrap();

        assert_eq!(graph.concept_count(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.segment_count(), 1);
        assert_eq!(graph.segments_with_token("pricing").len(), 1);
        assert!(graph.edge("sales strategy", "pricing").is_some());
        graph.check_invariants().unwrap();
    }

    #[test]
    fn serialized_snapshot_has_export_structure() {
        let mut graph = ConceptGraph::new();
        graph.upsert_concept_at("pricing", ConceptOptions::default(), 0);
        let json = serde_json::to_value(graph.snapshot()).unwrap();

        assert!(json["exportedAt"].is_string());
        assert!(json["segments"].is_array());
        assert_eq!(json["nodes"].as_array().unwrap().len(), 1);
        assert!(json["edges"].is_array());
    }
}
