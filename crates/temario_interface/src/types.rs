//! Value types exchanged with the collaborators.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// How [`crate::DocumentStore::set`] treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum WriteMode {
    /// Replace the whole document
    Overwrite,
    /// Replace only the top-level fields present in the new document
    Merge,
}

/// A document read back from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document id within its collection
    pub id: String,
    /// Document body
    pub data: JsonValue,
}

/// Merge `patch` into `target` one level deep.
///
/// Non-object values replace the target outright.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use temario_interface::merge_documents;
///
/// let mut doc = json!({"status": "generating", "version": 1});
/// merge_documents(&mut doc, json!({"status": "published", "pdfUrl": null}));
/// assert_eq!(doc, json!({"status": "published", "version": 1, "pdfUrl": null}));
/// ```
pub fn merge_documents(target: &mut JsonValue, patch: JsonValue) {
    match (target, patch) {
        (JsonValue::Object(existing), JsonValue::Object(fields)) => {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Result of an object upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage key
    pub key: String,
    /// Public download URL
    pub url: String,
    /// Size of the object in bytes
    pub size_bytes: usize,
    /// SHA-256 of the content, hex encoded
    pub content_hash: String,
}

/// Compression level requested from the render endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Compression {
    /// Default rendering
    Standard,
    /// Smallest output: lower image quality, no embedded fonts
    Aggressive,
}

/// Body of `POST /api/syllabus/{assistantId}/pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Document title
    pub title: String,
    /// Markdown body
    pub content_markdown: String,
    /// Optional compression hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
}

/// Outcome of probing a stored URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx within the deadline
    Reachable,
    /// Anything else, with the reason for logs
    Unreachable(String),
}

impl ProbeOutcome {
    /// True for [`ProbeOutcome::Reachable`].
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}
