//! JSON serialization and load-time validation.
//!
//! A document is stored as a JSON object with keys `nodes`, `connectors`,
//! `viewport`, `grid` and `routingStyle`. Loading runs [`validate`] over the
//! raw value before deserializing, so a rejected payload never reaches the
//! live document.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use serde_json::{Map, Value};

use crate::doc::{Document, NodeKind};

/// Why a payload was refused at the load boundary.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("document must be a JSON object")]
    NotAnObject,
    #[error("`{0}` is missing or not an object")]
    MissingMap(&'static str),
    #[error("node `{0}` is not an object")]
    InvalidNodeEntry(String),
    #[error("node stored under `{key}` has id `{id}`")]
    NodeIdMismatch { key: String, id: String },
    #[error("node `{0}` has no string kind")]
    NodeKindMissing(String),
    #[error("node `{id}` has unknown kind `{kind}`")]
    UnknownNodeKind { id: String, kind: String },
    #[error("node `{0}` has a malformed position")]
    NodePositionInvalid(String),
    #[error("node `{0}` has a malformed size")]
    NodeSizeInvalid(String),
    #[error("connector `{0}` is not an object")]
    InvalidConnectorEntry(String),
    #[error("connector stored under `{key}` has id `{id}`")]
    ConnectorIdMismatch { key: String, id: String },
    #[error("connector `{0}` source/target must be strings")]
    ConnectorEndpointsInvalid(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Check the structural contract of a document payload.
///
/// # Errors
///
/// Returns the first violation found, in key order.
pub fn validate(value: &Value) -> Result<(), LoadError> {
    let root = value.as_object().ok_or(LoadError::NotAnObject)?;
    let nodes = map_field(root, "nodes")?;
    let connectors = map_field(root, "connectors")?;

    for (key, entry) in nodes {
        validate_node(key, entry)?;
    }
    for (key, entry) in connectors {
        validate_connector(key, entry)?;
    }
    Ok(())
}

fn map_field<'a>(root: &'a Map<String, Value>, name: &'static str) -> Result<&'a Map<String, Value>, LoadError> {
    root.get(name).and_then(Value::as_object).ok_or(LoadError::MissingMap(name))
}

/// A stored `id` must equal its map key. A missing id is also a mismatch.
fn check_id(key: &str, entry: &Map<String, Value>) -> Result<(), String> {
    match entry.get("id").and_then(Value::as_str) {
        Some(id) if id == key => Ok(()),
        Some(id) => Err(id.to_string()),
        None => Err(String::new()),
    }
}

fn has_numbers(value: Option<&Value>, fields: [&str; 2]) -> bool {
    value
        .and_then(Value::as_object)
        .is_some_and(|obj| fields.iter().all(|f| obj.get(*f).is_some_and(Value::is_number)))
}

fn validate_node(key: &str, entry: &Value) -> Result<(), LoadError> {
    let node = entry.as_object().ok_or_else(|| LoadError::InvalidNodeEntry(key.to_string()))?;
    check_id(key, node).map_err(|id| LoadError::NodeIdMismatch { key: key.to_string(), id })?;

    let kind = node
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::NodeKindMissing(key.to_string()))?;
    if NodeKind::parse(kind).is_none() {
        return Err(LoadError::UnknownNodeKind { id: key.to_string(), kind: kind.to_string() });
    }
    if !has_numbers(node.get("position"), ["x", "y"]) {
        return Err(LoadError::NodePositionInvalid(key.to_string()));
    }
    if !has_numbers(node.get("size"), ["width", "height"]) {
        return Err(LoadError::NodeSizeInvalid(key.to_string()));
    }
    Ok(())
}

fn validate_connector(key: &str, entry: &Value) -> Result<(), LoadError> {
    let connector = entry.as_object().ok_or_else(|| LoadError::InvalidConnectorEntry(key.to_string()))?;
    check_id(key, connector).map_err(|id| LoadError::ConnectorIdMismatch { key: key.to_string(), id })?;

    let is_str = |field: &str| connector.get(field).is_some_and(Value::is_string);
    if !(is_str("source") && is_str("target")) {
        return Err(LoadError::ConnectorEndpointsInvalid(key.to_string()));
    }
    Ok(())
}

/// Validate then deserialize a JSON value.
///
/// Transient fields (selection, draft, revision) start empty.
///
/// # Errors
///
/// Returns a [`LoadError`] if validation or deserialization fails.
pub fn document_from_value(value: Value) -> Result<Document, LoadError> {
    validate(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Parse, validate and deserialize a JSON string.
///
/// # Errors
///
/// Returns a [`LoadError`] on malformed JSON or a contract violation.
pub fn parse_document(text: &str) -> Result<Document, LoadError> {
    let value: Value = serde_json::from_str(text)?;
    document_from_value(value)
}

/// The serialized form of `doc`.
///
/// # Errors
///
/// Fails only if a node's property bag cannot be represented as JSON.
pub fn to_value(doc: &Document) -> Result<Value, serde_json::Error> {
    serde_json::to_value(doc)
}

/// Pretty-printed JSON for export.
///
/// # Errors
///
/// Same as [`to_value`].
pub fn to_json(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}
