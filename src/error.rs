//! Error types for the retrieval-augmented query subsystem.
//!
//! The taxonomy separates failures the caller can act on:
//! - configuration problems (fatal at construction, no service is created),
//! - provider failures (one embedding or generation call failed; fail-fast,
//!   never retried here),
//! - queries issued before the service is ready,
//! - snapshot persistence failures.
//!
//! An empty retrieval result is deliberately *not* an error — see
//! [`RagOrchestrator::query`](crate::service::RagOrchestrator::query).

use thiserror::Error;

/// Errors surfaced by the document index and orchestrator.
#[derive(Error, Debug)]
pub enum RagError {
    /// A required credential or setting was missing at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An embedding or generation provider call failed.
    ///
    /// There is no internal retry; a single failure is terminal for
    /// that call and must be retried, if desired, by the caller.
    #[error("{operation} provider call failed: {message}")]
    Provider { operation: String, message: String },

    /// The embedding returned by the provider does not match the
    /// dimensionality of the vectors already in the index.
    #[error("embedding dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A query was attempted while the orchestrator was not `Ready`.
    #[error("service not initialized")]
    ServiceNotInitialized,

    /// The persisted snapshot is missing, corrupt, or incompatible.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Filesystem I/O while reading a corpus or writing a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Shorthand for a provider failure on a named operation.
    pub fn provider(operation: &str, err: impl std::fmt::Display) -> Self {
        RagError::Provider {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}
