//! Document stores supplying the knowledge corpus.
//!
//! A [`DocumentStore`] produces the raw content+metadata pairs that the
//! index embeds during initialization. Two implementations are provided:
//!
//! - [`StaticDocumentStore`] — the built-in GRC guideline corpus.
//! - [`JsonDocumentStore`] — loads a JSON array of `{content, metadata}`
//!   objects from a file.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::RagError;
use crate::models::Document;

/// Supplies the corpus to index.
///
/// The corpus is static in this version: it is loaded once during
/// orchestrator initialization and never refreshed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_documents(&self) -> Result<Vec<Document>, RagError>;
}

/// Built-in governance/risk/compliance corpus.
pub struct StaticDocumentStore;

#[async_trait]
impl DocumentStore for StaticDocumentStore {
    async fn load_documents(&self) -> Result<Vec<Document>, RagError> {
        let documents = vec![
            Document::new(
                "SATIM is committed to maintaining the highest standards of corporate \
                 governance and compliance.",
                json!({ "source": "SATIM GRC Guidelines", "page": 1 }),
            ),
            Document::new(
                "All employees must follow the company's code of conduct and ethical \
                 guidelines.",
                json!({ "source": "SATIM Code of Conduct", "page": 2 }),
            ),
            Document::new(
                "Regular risk assessments and audits are conducted to ensure compliance \
                 with regulatory requirements.",
                json!({ "source": "SATIM Risk Management Policy", "page": 3 }),
            ),
        ];
        debug!(count = documents.len(), "loaded built-in corpus");
        Ok(documents)
    }
}

/// Loads the corpus from a JSON file containing an array of
/// `{ "content": ..., "metadata": {...} }` objects.
pub struct JsonDocumentStore {
    path: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn load_documents(&self) -> Result<Vec<Document>, RagError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let documents: Vec<Document> = serde_json::from_str(&content).map_err(|e| {
            RagError::Snapshot(format!(
                "invalid corpus file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!(
            count = documents.len(),
            path = %self.path.display(),
            "loaded corpus file"
        );
        Ok(documents)
    }
}
