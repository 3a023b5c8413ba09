//! Mock services for testing and offline runs

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ragkit_core::generation::ScriptedStream;

use crate::{AnswerStream, Embeddings, Error, Message, Provider, Result};

/// Generation stand-in that streams a fixed reply
///
/// The reply is cut into ten-character fragments so consumers see a real
/// multi-chunk stream. The last prompt it received is kept for inspection.
pub struct MockProvider {
    reply: String,
    last_prompt: Mutex<Option<String>>,
}

impl MockProvider {
    /// Provider that always answers `reply`
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            last_prompt: Mutex::new(None),
        }
    }

    /// Content of the final message of the most recent request
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .ok()
            .and_then(|prompt| prompt.clone())
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream_chat(&self, _model: &str, messages: Vec<Message>) -> Result<AnswerStream> {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = messages.last().map(|m| m.content.clone());
        }
        Ok(ScriptedStream::chunked(&self.reply, 10).build())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Deterministic bag-of-words embedder
///
/// Each lowercase word is hashed (FNV-1a) into one of `dimension` buckets, so
/// texts sharing words get similar vectors without any model behind them.
pub struct MockEmbeddings {
    dimension: usize,
    fail_on: HashSet<String>,
    calls: AtomicUsize,
}

impl MockEmbeddings {
    /// Create with the given vector width (at least 1)
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            fail_on: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make `embed` fail for exactly this text
    pub fn fail_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on.insert(text.into());
        self
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Vector for `text`, without counting a call
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) % self.dimension as u64;
            vector[bucket as usize] += 1.0;
        }
        vector
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl Embeddings for MockEmbeddings {
    async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(text) {
            return Err(Error::embedding(format!("mock refused to embed {:?}", text)));
        }
        Ok(self.vector_for(text))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use ragkit_core::retriever::cosine_similarity;

    #[tokio::test]
    async fn test_mock_provider_streams_reply() {
        let provider = MockProvider::new("Article 21 protects life and personal liberty.");
        let stream = provider
            .stream_chat("llama3", vec![Message::user("What does Article 21 say?")])
            .await
            .unwrap();

        let fragments: Vec<String> = stream.fragments().map(|f| f.unwrap()).collect().await;
        assert!(fragments.len() > 1);
        assert_eq!(
            fragments.concat(),
            "Article 21 protects life and personal liberty."
        );
        assert_eq!(
            provider.last_prompt().as_deref(),
            Some("What does Article 21 say?")
        );
    }

    #[tokio::test]
    async fn test_mock_embeddings_are_deterministic() {
        let embedder = MockEmbeddings::new(16);
        let a = embedder.embed("m", "Right to Equality").await.unwrap();
        let b = embedder.embed("m", "right to equality").await.unwrap();

        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert_eq!(a.iter().sum::<f32>(), 3.0);
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_embeddings_similarity() {
        let embedder = MockEmbeddings::new(64);
        let query = embedder.vector_for("freedom of speech");
        let close = embedder.vector_for("freedom of speech and expression");
        let far = embedder.vector_for("");

        assert!(cosine_similarity(&query, &close) > 0.5);
        assert_eq!(cosine_similarity(&query, &far), 0.0);
    }

    #[tokio::test]
    async fn test_mock_embeddings_fail_on() {
        let embedder = MockEmbeddings::new(8).fail_on("broken");
        let err = embedder.embed("m", "broken").await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingService(_)));
        assert!(embedder.embed("m", "fine").await.is_ok());
    }
}
