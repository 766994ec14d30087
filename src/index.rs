//! In-memory vector index with cosine-similarity search and snapshot
//! persistence.
//!
//! The index is populated once during initialization (single-writer
//! phase) and treated as read-only afterward; [`VectorIndex::search`]
//! performs no mutation and needs no lock. Search is a brute-force
//! linear scan, O(n·d) — acceptable because the corpus stays small and
//! in-process. Scaling past that point needs an external vector
//! database, which is out of scope here.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embedding::{cosine_similarity, EmbeddingClient};
use crate::error::RagError;
use crate::models::{Document, SearchResult, VectorDocument};

/// Version tag written into every snapshot so future format changes can
/// migrate or reject old files instead of misreading them.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Serialized form of the whole index.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    schema_version: u32,
    model: String,
    dims: usize,
    documents: Vec<VectorDocument>,
}

/// In-memory collection of embedded documents.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingClient>,
    documents: Vec<VectorDocument>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            embedder,
            documents: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Embed and append a batch of documents.
    ///
    /// All-or-nothing: every document is embedded before anything is
    /// appended, so if any single embedding call fails the index size is
    /// unchanged. This is a contract, not an accident of ordering.
    ///
    /// Also enforces the uniform-dimensionality invariant: a vector
    /// whose length differs from the ones already stored is rejected.
    pub async fn add_documents(&mut self, docs: &[Document]) -> Result<(), RagError> {
        let mut pending = Vec::with_capacity(docs.len());
        for doc in docs {
            let embedding = self.embedder.embed(&doc.content).await?;
            pending.push(VectorDocument {
                document: doc.clone(),
                embedding,
            });
        }

        let mut expected = self.documents.first().map(|d| d.embedding.len());
        for vdoc in &pending {
            match expected {
                Some(n) if vdoc.embedding.len() != n => {
                    return Err(RagError::DimensionMismatch {
                        expected: n,
                        actual: vdoc.embedding.len(),
                    });
                }
                Some(_) => {}
                None => expected = Some(vdoc.embedding.len()),
            }
        }

        self.documents.extend(pending);
        debug!(added = docs.len(), total = self.documents.len(), "indexed documents");
        Ok(())
    }

    /// Embed the query and return the `k` most similar documents,
    /// descending by cosine score with ties kept in insertion order.
    ///
    /// An empty index yields an empty result, never an error; the query
    /// is not even embedded in that case, saving a provider call.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, RagError> {
        if self.documents.is_empty() {
            debug!("search on empty index");
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).await?;

        let mut results: Vec<SearchResult> = self
            .documents
            .iter()
            .map(|vdoc| SearchResult {
                document: vdoc.clone(),
                score: cosine_similarity(&query_vec, &vdoc.embedding),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }

    /// Serialize the whole index to a JSON snapshot at `path`.
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        let snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            model: self.embedder.model_name().to_string(),
            dims: self
                .documents
                .first()
                .map(|d| d.embedding.len())
                .unwrap_or_else(|| self.embedder.dims()),
            documents: self.documents.clone(),
        };

        let data = serde_json::to_string(&snapshot)
            .map_err(|e| RagError::Snapshot(format!("failed to serialize snapshot: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, data)?;
        info!(path = %path.display(), documents = self.documents.len(), "snapshot saved");
        Ok(())
    }

    /// Rebuild an index from a snapshot, replacing state wholesale.
    ///
    /// A missing or corrupt file, a schema version this build does not
    /// understand, or a snapshot recorded under a different embedding
    /// model all yield [`RagError::Snapshot`]. The caller decides whether
    /// to fall back to an empty index.
    pub fn load(path: &Path, embedder: Arc<dyn EmbeddingClient>) -> Result<Self, RagError> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            RagError::Snapshot(format!("failed to read snapshot {}: {}", path.display(), e))
        })?;

        let snapshot: Snapshot = serde_json::from_str(&data)
            .map_err(|e| RagError::Snapshot(format!("corrupt snapshot: {}", e)))?;

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(RagError::Snapshot(format!(
                "unsupported snapshot schema version {} (expected {})",
                snapshot.schema_version, SNAPSHOT_SCHEMA_VERSION
            )));
        }
        if snapshot.model != embedder.model_name() {
            return Err(RagError::Snapshot(format!(
                "snapshot was built with model '{}' but the active model is '{}'; \
                 re-index instead of mixing embeddings",
                snapshot.model,
                embedder.model_name()
            )));
        }
        if let Some(bad) = snapshot
            .documents
            .iter()
            .find(|d| d.embedding.len() != snapshot.dims)
        {
            return Err(RagError::Snapshot(format!(
                "snapshot vector length {} does not match declared dims {}",
                bad.embedding.len(),
                snapshot.dims
            )));
        }

        info!(path = %path.display(), documents = snapshot.documents.len(), "snapshot loaded");
        Ok(Self {
            embedder,
            documents: snapshot.documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test embedder returning canned vectors by exact text lookup.
    struct CannedEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        dims: usize,
        calls: AtomicUsize,
    }

    impl CannedEmbedder {
        fn new(dims: usize, entries: &[(&str, &[f32])]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_vec()))
                    .collect(),
                dims,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingClient for CannedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("boom") {
                return Err(RagError::provider("embedding", "simulated quota failure"));
            }
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0; self.dims]))
        }

        fn model_name(&self) -> &str {
            "canned-001"
        }

        fn dims(&self) -> usize {
            self.dims
        }
    }

    fn doc(content: &str) -> Document {
        Document::new(content, json!({ "source": content }))
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let embedder = Arc::new(CannedEmbedder::new(
            2,
            &[
                ("close", &[1.0, 0.0]),
                ("far", &[0.0, 1.0]),
                ("query", &[0.9, 0.1]),
            ],
        ));
        let mut index = VectorIndex::new(embedder);
        index
            .add_documents(&[doc("far"), doc("close")])
            .await
            .unwrap();

        let results = index.search("query", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.document.content, "close");
        assert!(results[0].score > results[1].score);
        for r in &results {
            assert!(r.score >= -1.0 && r.score <= 1.0);
        }
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let embedder = Arc::new(CannedEmbedder::new(2, &[("query", &[1.0, 0.0])]));
        let mut index = VectorIndex::new(embedder);
        index
            .add_documents(&[doc("a"), doc("b"), doc("c")])
            .await
            .unwrap();

        let results = index.search("query", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_tie_break_keeps_insertion_order() {
        // All stored vectors are zero, so every score is exactly 0.0.
        let embedder = Arc::new(CannedEmbedder::new(2, &[("query", &[1.0, 0.0])]));
        let mut index = VectorIndex::new(embedder);
        index
            .add_documents(&[doc("first"), doc("second"), doc("third")])
            .await
            .unwrap();

        let results = index.search("query", 3).await.unwrap();
        let order: Vec<&str> = results
            .iter()
            .map(|r| r.document.document.content.as_str())
            .collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty_without_embedding() {
        let embedder = Arc::new(CannedEmbedder::new(2, &[]));
        let calls = &embedder.calls;
        let index = VectorIndex::new(embedder.clone());

        let results = index.search("anything", 5).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_vector_scores_zero() {
        let embedder = Arc::new(CannedEmbedder::new(
            2,
            &[("query", &[1.0, 1.0]), ("zeroed", &[0.0, 0.0])],
        ));
        let mut index = VectorIndex::new(embedder);
        index.add_documents(&[doc("zeroed")]).await.unwrap();

        let results = index.search("query", 1).await.unwrap();
        assert_eq!(results[0].score, 0.0);
        assert!(!results[0].score.is_nan());
    }

    #[tokio::test]
    async fn test_add_documents_all_or_nothing() {
        let embedder = Arc::new(CannedEmbedder::new(2, &[("ok", &[1.0, 0.0])]));
        let mut index = VectorIndex::new(embedder);
        index.add_documents(&[doc("ok")]).await.unwrap();
        assert_eq!(index.len(), 1);

        let result = index
            .add_documents(&[doc("fine"), doc("boom goes the batch"), doc("also fine")])
            .await;
        assert!(result.is_err());
        assert_eq!(index.len(), 1, "no partial insert on batch failure");
    }

    #[tokio::test]
    async fn test_add_documents_rejects_mixed_dims() {
        let embedder = Arc::new(CannedEmbedder::new(
            2,
            &[("two", &[1.0, 0.0]), ("three", &[1.0, 0.0, 0.0])],
        ));
        let mut index = VectorIndex::new(embedder);
        index.add_documents(&[doc("two")]).await.unwrap();

        let result = index.add_documents(&[doc("three")]).await;
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let embedder: Arc<CannedEmbedder> = Arc::new(CannedEmbedder::new(
            2,
            &[("alpha", &[0.5, 0.5]), ("beta", &[0.25, -0.75])],
        ));
        let mut index = VectorIndex::new(embedder.clone());
        index
            .add_documents(&[doc("alpha"), doc("beta")])
            .await
            .unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        index.save(&path).unwrap();

        let restored = VectorIndex::load(&path, embedder).unwrap();
        assert_eq!(restored.documents, index.documents);
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_errors() {
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(CannedEmbedder::new(2, &[]));
        let result = VectorIndex::load(Path::new("/nonexistent/index.json"), embedder);
        assert!(matches!(result, Err(RagError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_snapshot() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, "{ definitely not a snapshot").unwrap();

        let embedder: Arc<dyn EmbeddingClient> = Arc::new(CannedEmbedder::new(2, &[]));
        assert!(matches!(
            VectorIndex::load(&path, embedder),
            Err(RagError::Snapshot(_))
        ));
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_schema_version() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"schema_version": 99, "model": "canned-001", "dims": 2, "documents": []}"#,
        )
        .unwrap();

        let embedder: Arc<dyn EmbeddingClient> = Arc::new(CannedEmbedder::new(2, &[]));
        assert!(matches!(
            VectorIndex::load(&path, embedder),
            Err(RagError::Snapshot(_))
        ));
    }

    #[tokio::test]
    async fn test_load_rejects_model_mismatch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"schema_version": 1, "model": "other-model", "dims": 2, "documents": []}"#,
        )
        .unwrap();

        let embedder: Arc<dyn EmbeddingClient> = Arc::new(CannedEmbedder::new(2, &[]));
        assert!(matches!(
            VectorIndex::load(&path, embedder),
            Err(RagError::Snapshot(_))
        ));
    }
}
