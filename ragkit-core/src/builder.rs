//! Embedding store builder
//!
//! Embeds every ingested record and collects the successful ones into a
//! [`VectorStore`]. A record whose embedding call fails is skipped and reported
//! in [`BuildReport::failures`]; the build carries on with the rest.

use std::path::Path;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::config::RagConfig;
use crate::embedding::{preview, validate_embedding, Embeddings};
use crate::error::{Error, Result};
use crate::ingest::TextRecord;
use crate::store::{EmbeddingRecord, VectorStore};

const PREVIEW_CHARS: usize = 50;
const PROGRESS_EVERY: usize = 100;

/// Options for a store build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Embedding model id
    pub model: String,
    /// Maximum embedding calls in flight
    pub concurrency: usize,
}

impl BuildOptions {
    /// Sequential build with `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            concurrency: 1,
        }
    }

    /// Set the number of concurrent embedding calls
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl From<&RagConfig> for BuildOptions {
    fn from(config: &RagConfig) -> Self {
        Self::new(config.embedding_model.clone()).with_concurrency(config.concurrency)
    }
}

/// A record that was skipped during a build
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingFailure {
    /// Position of the record in the ingested sequence
    pub index: usize,
    /// Leading characters of the record text
    pub preview: String,
    /// Why the record was skipped
    pub error: String,
}

/// Outcome of a build
#[derive(Debug)]
pub struct BuildReport {
    /// Successfully embedded records, in ingestion order
    pub store: VectorStore,
    /// Records that were skipped
    pub failures: Vec<EmbeddingFailure>,
    /// Records submitted to the embedding service
    pub attempted: usize,
}

impl BuildReport {
    /// Whether any record was skipped
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Builds a [`VectorStore`] from text records
pub struct StoreBuilder<E> {
    embedder: E,
    options: BuildOptions,
}

impl<E: Embeddings> StoreBuilder<E> {
    /// Create a builder
    pub fn new(embedder: E, options: BuildOptions) -> Self {
        Self { embedder, options }
    }

    /// Embed every record and collect the results
    ///
    /// Output order always equals input order, whatever the concurrency. Fails with
    /// [`Error::EmbeddingUnavailable`] only when records were given and none of
    /// them could be embedded.
    #[instrument(skip_all, fields(model = %self.options.model, records = records.len()))]
    pub async fn build(&self, records: Vec<TextRecord>) -> Result<BuildReport> {
        let attempted = records.len();
        let model = self.options.model.as_str();
        let embedder = &self.embedder;

        info!(
            "Generating embeddings using '{}' via {}",
            model,
            embedder.name()
        );

        // `buffered` yields in submission order and lets every in-flight call run
        // to completion regardless of sibling failures.
        let mut results = stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| async move {
                let outcome = embedder
                    .embed(model, record.text())
                    .await
                    .and_then(|vector| validate_embedding(&vector).map(|_| vector));
                (index, record, outcome)
            })
            .buffered(self.options.concurrency.max(1));

        let mut store = VectorStore::new(model);
        let mut failures = Vec::new();
        let mut done = 0;

        while let Some((index, record, outcome)) = results.next().await {
            done += 1;
            let pushed = outcome.and_then(|vector| {
                store.push(EmbeddingRecord::new(record.text(), vector))
            });

            if let Err(e) = pushed {
                let failure = EmbeddingFailure {
                    index,
                    preview: preview(record.text(), PREVIEW_CHARS),
                    error: e.to_string(),
                };
                warn!(
                    index,
                    "Error processing chunk: '{}'. Error: {}",
                    failure.preview,
                    failure.error
                );
                failures.push(failure);
            }

            if done % PROGRESS_EVERY == 0 {
                info!("Processed {}/{} chunks", done, attempted);
            }
        }

        if attempted > 0 && store.is_empty() {
            return Err(Error::EmbeddingUnavailable { attempted });
        }
        if attempted == 0 {
            warn!("No records to embed; the store will be empty");
        }

        info!(
            stored = store.len(),
            skipped = failures.len(),
            "Embedding finished"
        );

        Ok(BuildReport {
            store,
            failures,
            attempted,
        })
    }

    /// Build the store and persist it atomically to `path`
    pub async fn build_and_save(
        &self,
        records: Vec<TextRecord>,
        path: impl AsRef<Path>,
    ) -> Result<BuildReport> {
        let report = self.build(records).await?;
        report.store.save(path)?;
        Ok(report)
    }
}
