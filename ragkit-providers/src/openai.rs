//! OpenAI provider implementation
//!
//! Works with any server speaking the same `/embeddings` and `/chat/completions`
//! routes (Groq, Mistral, vLLM, LM Studio) via [`OpenAI::with_base_url`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::{decode_stream, SSE_DELIMITER};
use crate::{
    AnswerChunk, AnswerStream, Embeddings, Error, HttpConfig, Message, Provider, Result,
};

/// Public OpenAI endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client
pub struct OpenAI {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAI {
    /// Create from API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create from environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::config("OPENAI_API_KEY not set"))?;
        Self::new(api_key)
    }

    /// Create with custom base URL (for compatible APIs)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_http_config(api_key, base_url, &HttpConfig::default())
    }

    /// Create with custom base URL and HTTP settings
    pub fn with_http_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        http: &HttpConfig,
    ) -> Result<Self> {
        Ok(Self {
            client: http.build_client()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Parse one Server-Sent Event from `/chat/completions`
fn parse_sse_message(message: &str) -> Result<Option<AnswerChunk>> {
    // Comments and non-data fields carry nothing for us
    let Some(data) = message
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
    else {
        return Ok(None);
    };

    if data == "[DONE]" {
        return Ok(Some(AnswerChunk::End));
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse OpenAI stream chunk: {}", e);
            return Ok(None);
        }
    };
    if let Some(error) = value.get("error") {
        return Err(Error::ProviderApi(format!("OpenAI stream error: {}", error)));
    }

    let chunk: StreamChunk = serde_json::from_value(value)?;
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    match choice.delta.content {
        Some(content) if !content.is_empty() => Ok(Some(AnswerChunk::Fragment(content))),
        _ if choice.finish_reason.is_some() => Ok(Some(AnswerChunk::End)),
        _ => Ok(None),
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Decode an `/embeddings` response body
fn parse_embedding(body: &str) -> Result<Vec<f32>> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedEmbedding(format!("OpenAI embeddings response: {}", e)))?;
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MalformedEmbedding("No embedding returned".to_string()))
}

#[async_trait]
impl Embeddings for OpenAI {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let response = self
            .post("/embeddings")
            .json(&EmbeddingRequest { input: text, model })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::embedding(format!("OpenAI response unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(Error::embedding(format!(
                "OpenAI Embeddings API error {}: {}",
                status, body
            )));
        }

        parse_embedding(&body)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn stream_chat(&self, model: &str, messages: Vec<Message>) -> Result<AnswerStream> {
        let request = ChatRequest {
            model,
            messages: &messages,
            stream: true,
        };

        let response = self.post("/chat/completions").json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "OpenAI chat completions error {}: {}",
                status, body
            )));
        }

        let stream = decode_stream(response.bytes_stream(), SSE_DELIMITER, parse_sse_message);
        Ok(AnswerStream::from_stream(stream))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
