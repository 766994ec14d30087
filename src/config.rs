use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
}

/// Remote embedding/generation provider settings.
///
/// The API key itself is never stored in the config file; it is read
/// from the `GEMINI_API_KEY` environment variable at client construction.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            embedding_dims: default_embedding_dims(),
            generation_model: default_generation_model(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "embedding-001".to_string()
}
fn default_embedding_dims() -> usize {
    768
}
fn default_generation_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> u32 {
    40
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_output_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// How many documents to retrieve as context for each question.
    #[serde(default = "default_retrieval_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_retrieval_top_k(),
        }
    }
}

fn default_retrieval_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SnapshotConfig {
    /// Where to persist the serialized index. When set, `grca init`
    /// writes here and initialization restores from here if possible.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorpusConfig {
    /// Optional JSON corpus file (array of `{content, metadata}`).
    /// When absent, the built-in GRC corpus is used.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Build a configuration from defaults alone.
///
/// Used by [`RagOrchestrator::get_instance`](crate::service::RagOrchestrator::get_instance)
/// when no config file is in play; everything except the API key has a
/// usable default.
pub fn from_env() -> Result<Config> {
    let config = Config::default();
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.provider.embedding_dims == 0 {
        anyhow::bail!("provider.embedding_dims must be > 0");
    }
    if config.provider.embedding_model.is_empty() {
        anyhow::bail!("provider.embedding_model must not be empty");
    }
    if config.provider.generation_model.is_empty() {
        anyhow::bail!("provider.generation_model must not be empty");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        anyhow::bail!("provider.temperature must be in [0.0, 2.0]");
    }
    if !(0.0..=1.0).contains(&config.provider.top_p) {
        anyhow::bail!("provider.top_p must be in [0.0, 1.0]");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.provider.generation_model, "gemini-2.0-flash");
        assert_eq!(config.provider.embedding_model, "embedding-001");
        assert_eq!(config.provider.max_output_tokens, 1024);
        validate(&config).unwrap();
    }

    #[test]
    fn test_parse_minimal_file() {
        let config: Config = toml::from_str(
            r#"
            [retrieval]
            top_k = 5

            [snapshot]
            path = "data/index.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(
            config.snapshot.path.as_deref(),
            Some(Path::new("data/index.json"))
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.provider.temperature, 0.7);
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_top_p() {
        let mut config = Config::default();
        config.provider.top_p = 1.5;
        assert!(validate(&config).is_err());
    }
}
