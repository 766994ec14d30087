//! Core data models used throughout GRC Assist.
//!
//! These types represent the documents, embedded vectors, search results,
//! and conversation messages that flow through the indexing and query
//! pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A knowledge-base document: raw text plus free-form metadata.
///
/// Immutable once loaded from the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// The `source` metadata field, if present.
    pub fn source_name(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// A document together with its embedding vector.
///
/// Every vector in a given index has the same length, fixed by the
/// embedding model in use. Mixing models without re-embedding the whole
/// index is forbidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    #[serde(flatten)]
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// A ranked hit from the vector index.
///
/// The score is cosine similarity, nominally in `[-1, 1]`; for this
/// corpus effectively in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: VectorDocument,
    pub score: f32,
}

/// A cited source attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

impl From<&SearchResult> for Source {
    fn from(result: &SearchResult) -> Self {
        let doc = &result.document.document;
        Source {
            name: doc
                .source_name()
                .unwrap_or("Unknown Source")
                .to_string(),
            content: doc.content.clone(),
            metadata: doc.metadata.clone(),
        }
    }
}

/// The orchestrator's answer to one question.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in an assistant session's append-only history.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Sources cited by an assistant answer; empty for user messages
    /// and synthetic error messages.
    pub sources: Vec<Source>,
}

impl AssistantMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_name_from_metadata() {
        let doc = Document::new("text", json!({"source": "Risk Policy", "page": 3}));
        assert_eq!(doc.source_name(), Some("Risk Policy"));
    }

    #[test]
    fn test_source_defaults_to_placeholder() {
        let result = SearchResult {
            document: VectorDocument {
                document: Document::new("text", json!({"page": 1})),
                embedding: vec![0.1, 0.2],
            },
            score: 0.5,
        };
        let source = Source::from(&result);
        assert_eq!(source.name, "Unknown Source");
        assert_eq!(source.content, "text");
    }

    #[test]
    fn test_vector_document_json_shape() {
        // Snapshot format keeps content/metadata flattened next to the
        // embedding, matching the persisted layout.
        let vdoc = VectorDocument {
            document: Document::new("body", json!({"source": "S"})),
            embedding: vec![1.0, 2.0],
        };
        let value = serde_json::to_value(&vdoc).unwrap();
        assert_eq!(value["content"], "body");
        assert_eq!(value["metadata"]["source"], "S");
        assert_eq!(value["embedding"][1], 2.0);
    }
}
