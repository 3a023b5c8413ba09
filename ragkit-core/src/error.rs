//! Error types for ragkit

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ragkit's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ragkit
#[derive(Debug, Error)]
pub enum Error {
    // ============ Source Errors ============
    /// Tabular source could not be opened
    #[error("Source not found: {}", .path.display())]
    SourceNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Column selector is out of range for the source
    #[error("Column {column} not found: source has {width} column(s)")]
    ColumnNotFound {
        /// Requested column index
        column: usize,
        /// Widest row in the source
        width: usize,
    },

    /// Source could not be parsed as rows of fields
    #[error("Source parse error: {0}")]
    SourceParse(String),

    // ============ Embedding Errors ============
    /// Embedding service call failed
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// Embedding service answered with something that is not a usable vector
    #[error("Malformed embedding response: {0}")]
    MalformedEmbedding(String),

    /// Every record attempted during a build failed to embed
    #[error("Embedding service unavailable: all {attempted} record(s) failed to embed")]
    EmbeddingUnavailable {
        /// Number of records attempted
        attempted: usize,
    },

    // ============ Store Errors ============
    /// Persisted store is absent
    #[error("Vector store not found at {}: build it first", .path.display())]
    StoreNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Persisted store could not be decoded
    #[error("Vector store corrupt: {0}")]
    StoreCorrupt(String),

    /// Vector length differs from the store dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the store
        expected: usize,
        /// Dimensionality of the offending vector
        actual: usize,
    },

    // ============ Generation Errors ============
    /// Generation provider API error
    #[error("Provider API error: {0}")]
    ProviderApi(String),

    /// Stream interrupted
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    // ============ Orchestration Errors ============
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Retrieval produced no passages to ground an answer
    #[error("No relevant context found for the question")]
    NoContext,

    // ============ Network Errors ============
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ============ System Errors ============
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new embedding service error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingService(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Name of the pipeline stage this error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } | Self::ColumnNotFound { .. } | Self::SourceParse(_) => {
                "ingest"
            }
            Self::EmbeddingService(_) | Self::MalformedEmbedding(_) => "embed",
            Self::EmbeddingUnavailable { .. } => "build",
            Self::StoreNotFound { .. } | Self::StoreCorrupt(_) => "store",
            Self::DimensionMismatch { .. } | Self::NoContext => "retrieve",
            Self::ProviderApi(_) | Self::StreamInterrupted(_) => "generate",
            Self::Config(_) => "config",
            Self::Http(_) | Self::Io(_) | Self::Json(_) | Self::Internal(_) => "io",
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingService(_) | Self::StreamInterrupted(_) | Self::Http(_)
        )
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::SourceParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(
            Error::ColumnNotFound { column: 3, width: 1 }.stage(),
            "ingest"
        );
        assert_eq!(Error::embedding("timeout").stage(), "embed");
        assert_eq!(Error::EmbeddingUnavailable { attempted: 2 }.stage(), "build");
        assert_eq!(
            Error::StoreNotFound { path: PathBuf::from("x.bin") }.stage(),
            "store"
        );
        assert_eq!(
            Error::DimensionMismatch { expected: 3, actual: 2 }.stage(),
            "retrieve"
        );
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = Error::StoreNotFound {
            path: PathBuf::from("db/vectors.bin"),
        };
        assert_eq!(
            err.to_string(),
            "Vector store not found at db/vectors.bin: build it first"
        );

        let err = Error::ColumnNotFound { column: 4, width: 2 };
        assert_eq!(err.to_string(), "Column 4 not found: source has 2 column(s)");
    }

    #[test]
    fn test_retryable() {
        assert!(Error::embedding("connection reset").is_retryable());
        assert!(!Error::NoContext.is_retryable());
        assert!(!Error::StoreCorrupt("bad header".into()).is_retryable());
    }
}
