//! Ollama provider implementation
//!
//! Talks to Ollama's native API: `/api/embeddings` for vectors and `/api/chat`
//! for streamed answers (newline-delimited JSON). Runs models locally, so the
//! corpus never leaves the machine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::{decode_stream, NDJSON_DELIMITER};
use crate::{
    AnswerChunk, AnswerStream, Embeddings, Error, HttpConfig, Message, Provider, Result,
};

/// Default Ollama server
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama API client
#[derive(Debug, Clone)]
pub struct Ollama {
    client: reqwest::Client,
    base_url: String,
}

impl Ollama {
    /// Create with custom Ollama server URL
    ///
    /// # Example
    /// ```no_run
    /// use ragkit_providers::ollama::Ollama;
    ///
    /// // Connect to local Ollama instance
    /// let ollama = Ollama::new("http://localhost:11434").unwrap();
    ///
    /// // Connect to remote Ollama server
    /// let ollama = Ollama::new("http://192.168.1.100:11434").unwrap();
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_http_config(base_url, &HttpConfig::default())
    }

    /// Create with explicit HTTP settings
    pub fn with_http_config(base_url: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http.build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create with default local Ollama server
    ///
    /// Can be overridden with `OLLAMA_BASE_URL` environment variable.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Server URL in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// One NDJSON line of a streamed chat
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Parse one line of an `/api/chat` stream
fn parse_chat_line(line: &str) -> Result<Option<AnswerChunk>> {
    let chunk: ChatChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!("Failed to parse Ollama chat chunk: {}", e);
            return Ok(None);
        }
    };

    if let Some(error) = chunk.error {
        return Err(Error::ProviderApi(format!("Ollama error: {}", error)));
    }
    if chunk.done {
        return Ok(Some(AnswerChunk::End));
    }
    Ok(chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty())
        .map(AnswerChunk::Fragment))
}

/// Decode an `/api/embeddings` response body
fn parse_embedding(body: &str) -> Result<Vec<f32>> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedEmbedding(format!("Ollama embeddings response: {}", e)))?;
    if response.embedding.is_empty() {
        return Err(Error::MalformedEmbedding(
            "Ollama returned an empty embedding (is the model an embedding model?)".to_string(),
        ));
    }
    Ok(response.embedding)
}

#[async_trait]
impl Embeddings for Ollama {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&EmbeddingRequest { model, prompt: text })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::embedding(format!("Ollama response unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(Error::embedding(format!(
                "Ollama embeddings API error {}: {}",
                status, body
            )));
        }

        parse_embedding(&body)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn stream_chat(&self, model: &str, messages: Vec<Message>) -> Result<AnswerStream> {
        let request = ChatRequest {
            model,
            messages: &messages,
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "Ollama API error {}: {}",
                status, text
            )));
        }

        let stream = decode_stream(response.bytes_stream(), NDJSON_DELIMITER, parse_chat_line);
        Ok(AnswerStream::from_stream(stream))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
