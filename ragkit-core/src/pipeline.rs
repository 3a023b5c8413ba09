//! Retrieval-augmented answering
//!
//! Glue between the core and the two external services: makes sure a store
//! exists (building it from the configured source on first use), retrieves
//! context for a question and hands a grounded prompt to the generation provider.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, instrument};

use crate::builder::{BuildOptions, BuildReport, StoreBuilder};
use crate::config::RagConfig;
use crate::embedding::Embeddings;
use crate::error::{Error, Result};
use crate::generation::{AnswerStream, Message, Provider};
use crate::ingest::CorpusIngestor;
use crate::retriever::{Retriever, ScoredRecord};
use crate::store::VectorStore;

/// Answer to a question: the passages used as context and the streamed reply
pub struct Answer {
    /// Retrieved passages, best first
    pub passages: Vec<ScoredRecord>,
    /// Generated answer
    pub stream: AnswerStream,
}

/// Retrieval-augmented generation over a single vector store
pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn Embeddings>,
    provider: Arc<dyn Provider>,
    store: OnceCell<Arc<VectorStore>>,
}

impl RagPipeline {
    /// Create a pipeline
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn Embeddings>,
        provider: Arc<dyn Provider>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            embedder,
            provider,
            store: OnceCell::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Build the store from the configured source if it is not on disk yet
    ///
    /// Returns the build report when a build happened.
    pub async fn ensure_store(&self) -> Result<Option<BuildReport>> {
        if self.config.store_path.exists() {
            info!(path = %self.config.store_path.display(), "Vector database found");
            return Ok(None);
        }

        info!(
            path = %self.config.store_path.display(),
            "Vector database not found, building from source"
        );
        let records = CorpusIngestor::new(self.config.text_column)
            .read_path(&self.config.source_path)?;
        let builder = StoreBuilder::new(self.embedder.clone(), BuildOptions::from(&self.config));
        let report = builder
            .build_and_save(records, &self.config.store_path)
            .await?;
        Ok(Some(report))
    }

    /// The loaded store, read from disk once and shared afterwards
    pub async fn load_store(&self) -> Result<Arc<VectorStore>> {
        self.store
            .get_or_try_init(|| async {
                VectorStore::load(&self.config.store_path).map(Arc::new)
            })
            .await
            .cloned()
    }

    /// Top `config.top_n` passages for `question`
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredRecord>> {
        let store = self.load_store().await?;
        Retriever::new(self.embedder.clone(), self.config.embedding_model.clone())
            .retrieve(question, &store, self.config.top_n)
            .await
    }

    /// Retrieve context for `question` and start generating an answer
    #[instrument(skip(self), fields(model = %self.config.generation_model))]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let passages = self.retrieve(question).await?;
        if passages.is_empty() {
            return Err(Error::NoContext);
        }

        let prompt = build_prompt(&self.config.instruction, &passages, question);
        info!(passages = passages.len(), "Found relevant context, generating answer");

        let stream = self
            .provider
            .stream_chat(&self.config.generation_model, vec![Message::user(prompt)])
            .await?;

        Ok(Answer { passages, stream })
    }
}

/// Assemble the grounded prompt sent to the generation model
pub fn build_prompt(instruction: &str, passages: &[ScoredRecord], question: &str) -> String {
    let context = passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "**Instruction:** {instruction}\n\n\
         **Context:**\n{context}\n\n\
         **User's Question:** {question}\n\n\
         **Answer:**"
    )
}
