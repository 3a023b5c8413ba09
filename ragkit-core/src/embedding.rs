//! Embedding service contract
//!
//! The service itself lives outside this crate (see `ragkit-providers`); the core
//! only calls it through [`Embeddings`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Interface for embedding providers
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Generate the embedding vector for `text` with `model`
    ///
    /// Failures are reported as errors; an implementation must never substitute a
    /// zero vector for a failed call.
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;

    /// Get provider name (for logging/debugging)
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Embeddings + ?Sized> Embeddings for Arc<T> {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        (**self).embed(model, text).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Reject vectors that cannot be stored or scored
pub fn validate_embedding(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::MalformedEmbedding("empty vector".to_string()));
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(Error::MalformedEmbedding(format!(
            "non-finite value at index {}",
            pos
        )));
    }
    Ok(())
}

/// First `max_chars` characters of `text`, for log lines and failure reports
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_embedding() {
        assert!(validate_embedding(&[0.1, 0.2]).is_ok());
        assert!(validate_embedding(&[0.0, 0.0]).is_ok());
        assert!(matches!(
            validate_embedding(&[]),
            Err(Error::MalformedEmbedding(_))
        ));
        assert!(validate_embedding(&[1.0, f32::NAN]).is_err());
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("भारत का संविधान", 4), "भारत...");
    }
}
