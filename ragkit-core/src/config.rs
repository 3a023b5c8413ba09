//! Runtime configuration
//!
//! Everything the build and query paths need is carried in [`RagConfig`] and passed
//! explicitly; nothing is read from process-wide state after construction.
//!
//! ```yaml
//! source_path: "Constitution of India.csv"
//! text_column: 0
//! store_path: "vector_database_constitution.bin"
//! embedding_model: "bge-m3:567m"
//! generation_model: "llama3"
//! top_n: 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default embedding model id
pub const DEFAULT_EMBEDDING_MODEL: &str = "bge-m3:567m";
/// Default generation model id
pub const DEFAULT_GENERATION_MODEL: &str = "llama3";
/// Default number of passages retrieved per question
pub const DEFAULT_TOP_N: usize = 5;

const DEFAULT_INSTRUCTION: &str = "You are a helpful assistant specialized in the provided documents. \
Answer the user's question based *only* on the following context. \
If the information is not in the context, clearly state that you cannot answer based on the provided information.";

/// Which service backend the providers crate should construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Native Ollama API
    Ollama,
    /// OpenAI-compatible API
    OpenAi,
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::config(format!("unknown provider: {}", other))),
        }
    }
}

/// Configuration for building and querying a vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Tabular source file
    pub source_path: PathBuf,
    /// Column index holding passage text
    pub text_column: usize,
    /// Persisted vector store
    pub store_path: PathBuf,
    /// Model id used for every embedding call
    pub embedding_model: String,
    /// Model id used for answer generation
    pub generation_model: String,
    /// Passages retrieved per question
    pub top_n: usize,
    /// In-flight embedding calls during a build
    pub concurrency: usize,
    /// Service backend
    pub provider: ProviderKind,
    /// Override for the service URL
    pub base_url: Option<String>,
    /// API key for OpenAI-compatible services
    pub api_key: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Instruction placed at the top of every generation prompt
    pub instruction: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("corpus.csv"),
            text_column: 0,
            store_path: PathBuf::from("vector_store.bin"),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            top_n: DEFAULT_TOP_N,
            concurrency: 1,
            provider: ProviderKind::Ollama,
            base_url: None,
            api_key: None,
            timeout_secs: 60,
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

impl RagConfig {
    /// Load from a YAML file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse from a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(content)
            .map_err(|e| Error::config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RAGKIT_*` environment overrides (and `OLLAMA_BASE_URL`)
    pub fn apply_env(mut self) -> Result<Self> {
        self.apply_vars(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("RAGKIT_SOURCE") {
            self.source_path = PathBuf::from(v);
        }
        if let Some(v) = var("RAGKIT_STORE") {
            self.store_path = PathBuf::from(v);
        }
        if let Some(v) = var("RAGKIT_EMBEDDING_MODEL") {
            self.embedding_model = v;
        }
        if let Some(v) = var("RAGKIT_GENERATION_MODEL") {
            self.generation_model = v;
        }
        if let Some(v) = var("RAGKIT_TOP_N") {
            self.top_n = v
                .parse()
                .map_err(|_| Error::config(format!("RAGKIT_TOP_N is not a number: {}", v)))?;
        }
        if let Some(v) = var("RAGKIT_PROVIDER") {
            self.provider = v.parse()?;
        }
        if let Some(v) = var("RAGKIT_BASE_URL").or_else(|| var("OLLAMA_BASE_URL")) {
            self.base_url = Some(v);
        }
        if let Some(v) = var("RAGKIT_API_KEY") {
            self.api_key = Some(v);
        }
        Ok(())
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(Error::config("embedding_model must not be empty"));
        }
        if self.generation_model.trim().is_empty() {
            return Err(Error::config("generation_model must not be empty"));
        }
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.embedding_model, "bge-m3:567m");
        assert_eq!(config.generation_model, "llama3");
        assert_eq!(config.top_n, 5);
        assert_eq!(config.text_column, 0);
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RagConfig::from_yaml("top_n: 3\nprovider: openai\n").unwrap();
        assert_eq!(config.top_n, 3);
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = RagConfig::from_yaml("concurrency: 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RAGKIT_TOP_N", "8"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
            ("RAGKIT_EMBEDDING_MODEL", "nomic-embed-text"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.top_n, 8);
        assert_eq!(config.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.embedding_model, "nomic-embed-text");
    }

    #[test]
    fn test_bad_env_number() {
        let mut config = RagConfig::default();
        let err = config
            .apply_vars(|k| (k == "RAGKIT_TOP_N").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("RAGKIT_TOP_N"));
    }
}
