//! # ragkit core
//!
//! Retrieval-augmented generation over a fixed text corpus.
//!
//! This crate provides:
//! - Ingestion (`ingest`) - Extract clean passages from a CSV column
//! - Embedding contract (`embedding`) - The external embedding service seam
//! - Vector store (`store`) - Ordered (text, vector) records with atomic persistence
//! - Builder (`builder`) - Embed passages into a store, skipping failed records
//! - Retrieval (`retriever`) - Cosine top-K search over a store
//! - Generation contract (`generation`) - Streaming chat provider seam
//! - Pipeline (`pipeline`) - Auto-build, retrieve and ask in one place
//!
//! ```text
//! CSV ──▶ CorpusIngestor ──▶ StoreBuilder ──▶ vector_store.bin
//!                                 │                  │
//!                             Embeddings ◀──── Retriever ──▶ top-K passages
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod retriever;
pub mod store;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::builder::{BuildOptions, BuildReport, EmbeddingFailure, StoreBuilder};
    pub use crate::config::{ProviderKind, RagConfig};
    pub use crate::embedding::Embeddings;
    pub use crate::error::{Error, Result};
    pub use crate::generation::{AnswerChunk, AnswerStream, Message, Provider, Role};
    pub use crate::ingest::{CorpusIngestor, TextRecord};
    pub use crate::pipeline::{Answer, RagPipeline};
    pub use crate::retriever::{cosine_similarity, rank, Retriever, ScoredRecord};
    pub use crate::store::{EmbeddingRecord, VectorStore};
}
