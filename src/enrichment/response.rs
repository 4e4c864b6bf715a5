//! Parsing of enrichment responses
//!
//! Model output is untrusted: it may be wrapped in prose or a fenced code
//! block, nested in an envelope, or missing fields. Everything is read
//! field by field with explicit presence and type checks, and anything
//! unreadable degrades to an empty [`Analysis`].

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// A relationship suggested by the service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipHint {
    pub source: String,
    pub target: String,
    /// Raw strength as returned; normalized when folded
    pub strength: Option<f64>,
}

/// An alias suggested by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasHint {
    pub canonical: String,
    pub alias: String,
}

/// Structured result of a bulk analysis. Each field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analysis {
    pub concepts: Option<Vec<String>>,
    pub relationships: Option<Vec<RelationshipHint>>,
    pub aliases: Option<Vec<AliasHint>>,
    pub summary: Option<String>,
    pub themes: Option<Vec<String>>,
}

impl Analysis {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_none()
            && self.relationships.is_none()
            && self.aliases.is_none()
            && self.summary.is_none()
            && self.themes.is_none()
    }
}

/// Body of the first fenced block, without its language tag
fn fenced_block(text: &str) -> Option<&str> {
    let (_, after) = text.split_once("```")?;
    let (body, _) = after.split_once("```")?;
    let body = match body.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => body,
    };
    Some(body.trim())
}

/// Outermost `{ ... }` span, for objects wrapped in prose
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// First JSON object found in the whole reply, its fenced block, or its
/// outermost braces, in that order.
fn find_object(text: &str) -> Option<Value> {
    let text = text.trim();
    [Some(text), fenced_block(text), brace_span(text)]
        .into_iter()
        .flatten()
        .find_map(|candidate| {
            serde_json::from_str::<Value>(candidate)
                .ok()
                .filter(Value::is_object)
        })
}

/// Parse a raw service response into an [`Analysis`].
///
/// Never fails; see the module docs.
pub fn parse_analysis(text: &str) -> Analysis {
    match find_object(text) {
        Some(value) => analysis_from_value(&value),
        None => {
            warn!(
                preview = %text.chars().take(200).collect::<String>(),
                "no JSON object found in enrichment response"
            );
            Analysis::default()
        }
    }
}

/// Read an [`Analysis`] from an already-parsed value, unwrapping an
/// `{"analysis": ...}` envelope when present.
pub fn analysis_from_value(value: &Value) -> Analysis {
    let body = match value.get("analysis") {
        Some(inner) if inner.is_object() => inner,
        Some(_) => {
            warn!("enrichment response envelope carries no analysis");
            return Analysis::default();
        }
        None => value,
    };

    Analysis {
        concepts: body.get("concepts").and_then(|v| v.as_array()).map(|items| {
            items.iter().filter_map(concept_label).collect()
        }),
        relationships: body
            .get("relationships")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(relationship).collect()),
        aliases: body
            .get("aliases")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(alias).collect()),
        summary: body
            .get("summary")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        themes: body.get("themes").and_then(|v| v.as_array()).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        }),
    }
}

/// A concept is a plain string, or an object with "label" (or "name").
fn concept_label(value: &Value) -> Option<String> {
    let label = match value {
        Value::String(s) => s.as_str(),
        Value::Object(_) => value
            .get("label")
            .or_else(|| value.get("name"))
            .and_then(|v| v.as_str())?,
        _ => return None,
    };
    Some(label.to_string())
}

fn relationship(value: &Value) -> Option<RelationshipHint> {
    let source = value.get("source").and_then(|v| v.as_str())?;
    let target = value.get("target").and_then(|v| v.as_str())?;
    Some(RelationshipHint {
        source: source.to_string(),
        target: target.to_string(),
        strength: value.get("strength").and_then(|v| v.as_f64()),
    })
}

fn alias(value: &Value) -> Option<AliasHint> {
    let canonical = value.get("canonical").and_then(|v| v.as_str())?;
    let alias = value.get("alias").and_then(|v| v.as_str())?;
    Some(AliasHint {
        canonical: canonical.to_string(),
        alias: alias.to_string(),
    })
}
