//! # ragkit providers
//!
//! Embedding and generation service clients for ragkit.

#![warn(missing_docs)]

use std::sync::Arc;

// Re-export core types for convenience
pub use ragkit_core::config::{ProviderKind, RagConfig};
pub use ragkit_core::embedding::Embeddings;
pub use ragkit_core::error::{Error, Result};
pub use ragkit_core::generation::{AnswerChunk, AnswerStream, Message, Provider, Role};

pub mod mock;
pub mod utils;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(test)]
mod provider_tests;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Connection pool idle timeout
    pub pool_idle_timeout_secs: u64,
    /// Max idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpConfig {
    /// Default pool settings with the given request timeout
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..Self::default()
        }
    }

    /// Build a reqwest client
    pub fn build_client(&self) -> Result<reqwest::Client> {
        use std::time::Duration;

        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .build()
            .map_err(|e| Error::Internal(e.to_string()))
    }
}

/// The two external services a pipeline talks to
#[derive(Clone)]
pub struct Services {
    /// Embedding service
    pub embedder: Arc<dyn Embeddings>,
    /// Generation service
    pub provider: Arc<dyn Provider>,
}

/// Construct the services selected by `config`
pub fn services_from_config(config: &RagConfig) -> Result<Services> {
    let http = HttpConfig::with_timeout(config.timeout_secs);

    match config.provider {
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string());
            let client = Arc::new(ollama::Ollama::with_http_config(base_url, &http)?);
            Ok(Services {
                embedder: client.clone(),
                provider: client,
            })
        }
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| Error::config("OpenAI provider needs api_key or OPENAI_API_KEY"))?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string());
            let client = Arc::new(openai::OpenAI::with_http_config(api_key, base_url, &http)?);
            Ok(Services {
                embedder: client.clone(),
                provider: client,
            })
        }
        #[allow(unreachable_patterns)]
        other => Err(Error::config(format!(
            "provider {:?} is not compiled into this build",
            other
        ))),
    }
}
