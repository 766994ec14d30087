//! Generative text client abstraction and the Gemini implementation.
//!
//! The generative provider is an opaque external dependency: the client
//! passes the [`GenerationConfig`] through unchanged and surfaces any
//! failure as [`RagError::Provider`] with no local fallback or retry.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::{ProviderConfig, API_KEY_ENV};
use crate::error::RagError;

/// Sampling parameters forwarded verbatim to the provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling randomness.
    pub temperature: f32,
    /// Candidate pool size.
    pub top_k: u32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Response length cap.
    pub max_output_tokens: u32,
}

impl From<&ProviderConfig> for GenerationConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// Prompt + generation parameters → text.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, RagError>;
}

/// Generative client for the Gemini `generateContent` API.
pub struct GeminiGenerativeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerativeClient {
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
            model: config.generation_model.clone(),
        })
    }
}

#[async_trait]
impl GenerativeClient for GeminiGenerativeClient {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, RagError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": config,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::provider("generation", e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::Provider {
                operation: "generation".to_string(),
                message: format!("API error {}: {}", status, body_text),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::provider("generation", e))?;
        parse_generate_response(&json)
    }
}

/// Extract `candidates[0].content.parts[0].text` from a
/// `generateContent` response.
fn parse_generate_response(json: &serde_json::Value) -> Result<String, RagError> {
    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| RagError::Provider {
            operation: "generation".to_string(),
            message: "invalid response: missing candidates[0].content.parts[0].text".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_serializes_camel_case() {
        let config = GenerationConfig {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["topK"], 40);
        assert_eq!(value["topP"], 0.95f32);
        assert_eq!(value["maxOutputTokens"], 1024);
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_parse_generate_response() {
        let json = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Policies must be reviewed annually." }] }
            }]
        });
        let text = parse_generate_response(&json).unwrap();
        assert_eq!(text, "Policies must be reviewed annually.");
    }

    #[test]
    fn test_parse_generate_response_empty_candidates() {
        let json = serde_json::json!({ "candidates": [] });
        assert!(matches!(
            parse_generate_response(&json),
            Err(RagError::Provider { .. })
        ));
    }
}
