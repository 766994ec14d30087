//! The RAG orchestrator: a process-wide service that builds the vector
//! index once and turns questions into grounded answers with cited
//! sources.
//!
//! # Initialization
//!
//! The orchestrator moves through `Uninitialized → Initializing → Ready`,
//! or `Initializing → Failed`. Initialization (load corpus → embed →
//! index) runs at most once per process even when many callers race to
//! acquire the instance: the in-flight run is memoized in a
//! [`tokio::sync::OnceCell`], so concurrent first callers await the same
//! run instead of starting their own. After a failure the cell stays
//! empty — queries fail fast with [`RagError::ServiceNotInitialized`]
//! until a fresh attempt succeeds.
//!
//! # Query
//!
//! `query` retrieves the top-k most similar documents, assembles a
//! prompt from the retrieved snippets plus the question, and forwards it
//! to the generative provider. Retrieval is non-strict: with zero
//! retrieved results the prompt states that no context is available and
//! the model still answers from general knowledge. That condition is
//! logged, not raised.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::documents::{DocumentStore, JsonDocumentStore, StaticDocumentStore};
use crate::embedding::{EmbeddingClient, GeminiEmbeddingClient};
use crate::error::RagError;
use crate::generation::{GeminiGenerativeClient, GenerationConfig, GenerativeClient};
use crate::index::VectorIndex;
use crate::models::{RagResponse, SearchResult, Source};

/// Observable lifecycle state of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

static INSTANCE: OnceCell<Arc<RagOrchestrator>> = OnceCell::const_new();

/// Coordinates corpus loading, indexing, and query handling.
pub struct RagOrchestrator {
    generator: Arc<dyn GenerativeClient>,
    store: Arc<dyn DocumentStore>,
    generation: GenerationConfig,
    top_k: usize,
    snapshot_path: Option<PathBuf>,
    embedder: Arc<dyn EmbeddingClient>,
    /// Single-flight initialization cell; holds the index once built.
    index: OnceCell<VectorIndex>,
    initializing: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl RagOrchestrator {
    /// Assemble an orchestrator from explicit components.
    ///
    /// This is the seam tests and embedders use; production callers go
    /// through [`from_config`](Self::from_config) or
    /// [`get_instance`](Self::get_instance).
    pub fn new(
        config: &Config,
        embedder: Arc<dyn EmbeddingClient>,
        generator: Arc<dyn GenerativeClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            generator,
            store,
            generation: GenerationConfig::from(&config.provider),
            top_k: config.retrieval.top_k,
            snapshot_path: config.snapshot.path.clone(),
            embedder,
            index: OnceCell::new(),
            initializing: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// Build an orchestrator with the Gemini provider clients.
    ///
    /// # Errors
    ///
    /// [`RagError::Configuration`] if the API key is missing — fatal, no
    /// service is created.
    pub fn from_config(config: &Config) -> Result<Self, RagError> {
        let embedder: Arc<dyn EmbeddingClient> =
            Arc::new(GeminiEmbeddingClient::new(&config.provider)?);
        let generator: Arc<dyn GenerativeClient> =
            Arc::new(GeminiGenerativeClient::new(&config.provider)?);
        let store: Arc<dyn DocumentStore> = match &config.corpus.path {
            Some(path) => Arc::new(JsonDocumentStore::new(path)),
            None => Arc::new(StaticDocumentStore),
        };
        Ok(Self::new(config, embedder, generator, store))
    }

    /// The process-wide shared instance, initialized on first call.
    ///
    /// Idempotent: every caller receives the same `Arc`. Concurrent
    /// first callers await the same in-flight initialization. After a
    /// failed initialization the next call makes a fresh attempt.
    pub async fn get_instance() -> Result<Arc<RagOrchestrator>, RagError> {
        let instance = INSTANCE
            .get_or_try_init(|| async {
                let config = crate::config::from_env()
                    .map_err(|e| RagError::Configuration(e.to_string()))?;
                Ok::<_, RagError>(Arc::new(RagOrchestrator::from_config(&config)?))
            })
            .await?;
        instance.ensure_ready().await?;
        Ok(instance.clone())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        if self.index.initialized() {
            return ServiceState::Ready;
        }
        if self.initializing.load(Ordering::SeqCst) {
            return ServiceState::Initializing;
        }
        match self.last_error.lock().expect("state lock poisoned").clone() {
            Some(message) => ServiceState::Failed(message),
            None => ServiceState::Uninitialized,
        }
    }

    /// Number of documents in the index, if it has been built.
    pub fn index_len(&self) -> Option<usize> {
        self.index.get().map(VectorIndex::len)
    }

    /// Run (or await) initialization: restore the snapshot if one is
    /// configured and valid, otherwise load the corpus and embed it.
    ///
    /// At most one initialization runs at a time; concurrent callers
    /// await the same run. On failure the state becomes `Failed` and a
    /// later call retries from scratch.
    pub async fn ensure_ready(&self) -> Result<(), RagError> {
        let result = self
            .index
            .get_or_try_init(|| async {
                self.initializing.store(true, Ordering::SeqCst);
                let built = self.build_index().await;
                self.initializing.store(false, Ordering::SeqCst);
                built
            })
            .await;

        match result {
            Ok(_) => {
                *self.last_error.lock().expect("state lock poisoned") = None;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "initialization failed");
                *self.last_error.lock().expect("state lock poisoned") = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn build_index(&self) -> Result<VectorIndex, RagError> {
        if let Some(path) = &self.snapshot_path {
            match VectorIndex::load(path, self.embedder.clone()) {
                Ok(index) => {
                    info!(documents = index.len(), "restored index from snapshot");
                    return Ok(index);
                }
                Err(e) => {
                    // The one silently-downgraded failure: fall through
                    // and rebuild from the corpus.
                    warn!(error = %e, "snapshot unusable, rebuilding from corpus");
                }
            }
        }

        let documents = self.store.load_documents().await?;
        let mut index = VectorIndex::new(self.embedder.clone());
        index.add_documents(&documents).await?;
        info!(documents = index.len(), "index built from corpus");
        Ok(index)
    }

    /// Write the current index to the configured snapshot path.
    pub fn save_snapshot(&self) -> Result<(), RagError> {
        let index = self.index.get().ok_or(RagError::ServiceNotInitialized)?;
        let path = self
            .snapshot_path
            .as_ref()
            .ok_or_else(|| RagError::Snapshot("no snapshot path configured".to_string()))?;
        index.save(path)
    }

    /// Retrieve the `k` most similar documents for a query without
    /// generating an answer.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, RagError> {
        let index = self.index.get().ok_or(RagError::ServiceNotInitialized)?;
        index.search(query, k).await
    }

    /// Answer a question, grounded in the top-k retrieved documents.
    ///
    /// Precondition: the orchestrator is `Ready`; otherwise fails with
    /// [`RagError::ServiceNotInitialized`] without touching the network.
    pub async fn query(&self, question: &str) -> Result<RagResponse, RagError> {
        let index = self.index.get().ok_or(RagError::ServiceNotInitialized)?;

        let results = index.search(question, self.top_k).await?;
        if results.is_empty() {
            warn!("retrieval returned no context; answering from general knowledge");
        }

        let prompt = build_prompt(question, &results);
        let answer = self.generator.generate(&prompt, &self.generation).await?;

        let sources: Vec<Source> = results.iter().map(Source::from).collect();
        Ok(RagResponse { answer, sources })
    }
}

/// Assemble the generation prompt: persona, retrieved context (or an
/// explicit no-context line), the question, and plain-text response
/// format instructions.
fn build_prompt(question: &str, results: &[SearchResult]) -> String {
    let context = if results.is_empty() {
        "No specific context available.".to_string()
    } else {
        results
            .iter()
            .map(|r| r.document.document.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "You are an AI specialized in regulations, laws, and compliance. You have \
         expertise in ISO standards, cybersecurity regulations, and general compliance \
         frameworks.\n\
         \n\
         If the provided context contains specific information about the organization's \
         implementation or policies, use that information. However, you can also provide \
         general knowledge about regulations and laws even if they're not specifically \
         mentioned in the context.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Please provide a clear and concise answer that:\n\
         1. Directly addresses the question\n\
         2. Uses specific information from the context if available\n\
         3. Includes relevant regulatory knowledge\n\
         4. Keeps the response medium-length (2-3 paragraphs)\n\
         5. Avoids markdown formatting\n\
         6. Uses simple, clear language\n\
         7. Focuses on practical information\n\
         \n\
         Format your response as plain text with:\n\
         - A clear opening statement\n\
         - Supporting details in simple paragraphs\n\
         - No bullet points or special formatting\n\
         - No technical jargon unless necessary\n\
         \n\
         Answer:"
    )
}
