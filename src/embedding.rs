//! Embedding client abstraction and the Gemini implementation.
//!
//! Defines the [`EmbeddingClient`] trait plus the vector math shared with
//! the index:
//! - [`cosine_similarity`] — similarity between two embedding vectors,
//!   with an explicit zero-magnitude guard.
//!
//! # Failure policy
//!
//! Provider calls are fail-fast: a network, auth, or quota failure
//! surfaces as [`RagError::Provider`] and is never retried here. Retrying
//! is the caller's decision.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{ProviderConfig, API_KEY_ENV};
use crate::error::RagError;

/// Text → fixed-length vector.
///
/// Deterministic for a fixed model/version. Every vector produced by one
/// client instance has length [`dims`](EmbeddingClient::dims).
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Returns the model identifier (e.g. `"embedding-001"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
}

/// Embedding client for the Gemini `embedContent` API.
pub struct GeminiEmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
}

impl GeminiEmbeddingClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// [`RagError::Configuration`] if `GEMINI_API_KEY` is not set or the
    /// HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, RagError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            RagError::Configuration(format!("{} environment variable not set", API_KEY_ENV))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: config.embedding_model.clone(),
            dims: config.embedding_dims,
        })
    }
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:embedContent?key={}",
            self.model, self.api_key
        );

        let body = serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::provider("embedding", e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::Provider {
                operation: "embedding".to_string(),
                message: format!("API error {}: {}", status, body_text),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::provider("embedding", e))?;
        parse_embed_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Extract `embedding.values` from an `embedContent` response.
fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<f32>, RagError> {
    let values = json
        .get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| RagError::Provider {
            operation: "embedding".to_string(),
            message: "invalid response: missing embedding.values".to_string(),
        })?;

    Ok(values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns exactly `0.0` when either vector has zero magnitude, or for
/// empty vectors or vectors of different lengths — never NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
