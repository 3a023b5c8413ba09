//! Similarity retrieval
//!
//! Brute-force cosine scoring over every stored record followed by a stable
//! descending sort. There is no index: a query costs O(n·D) to score plus
//! O(n log n) to sort, which is fine for corpora of a few thousand passages.

use std::cmp::Ordering;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::embedding::{validate_embedding, Embeddings};
use crate::error::{Error, Result};
use crate::store::VectorStore;

/// A passage scored against a query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    /// Passage text
    pub text: String,
    /// Cosine similarity in `[-1, 1]`
    pub score: f64,
}

/// Cosine similarity between two vectors
///
/// Defined as `0.0` when either vector has zero norm. Computed in f64 and
/// clamped to `[-1, 1]` to absorb rounding.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Score every record in `store` against `query` and keep the best `top_n`
///
/// Equal scores keep their store order.
pub fn rank(query: &[f32], store: &VectorStore, top_n: usize) -> Result<Vec<ScoredRecord>> {
    if let Some(expected) = store.dimension() {
        if expected != query.len() {
            return Err(Error::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
    }

    let mut scored: Vec<ScoredRecord> = store
        .iter()
        .map(|record| ScoredRecord {
            text: record.text.clone(),
            score: cosine_similarity(query, &record.vector),
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_n);
    Ok(scored)
}

/// Embeds questions and ranks stored passages against them
pub struct Retriever<E> {
    embedder: E,
    model: String,
}

impl<E: Embeddings> Retriever<E> {
    /// Create a retriever that embeds queries with `model`
    ///
    /// Use the same model the store was built with.
    pub fn new(embedder: E, model: impl Into<String>) -> Self {
        Self {
            embedder,
            model: model.into(),
        }
    }

    /// Top `top_n` passages of `store` for `query`
    #[instrument(skip(self, store), fields(model = %self.model, store_size = store.len()))]
    pub async fn retrieve(
        &self,
        query: &str,
        store: &VectorStore,
        top_n: usize,
    ) -> Result<Vec<ScoredRecord>> {
        if !store.model().is_empty() && store.model() != self.model {
            warn!(
                store_model = %store.model(),
                "Query model differs from the model the store was built with"
            );
        }

        debug!("Generating embedding for the query");
        let query_vector = self.embedder.embed(&self.model, query).await?;
        validate_embedding(&query_vector)?;

        let results = rank(&query_vector, store, top_n)?;
        debug!(returned = results.len(), "Retrieved top chunks");
        Ok(results)
    }

    /// Load the store at `path` and retrieve from it
    pub async fn retrieve_from_path(
        &self,
        query: &str,
        path: impl AsRef<Path>,
        top_n: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let store = VectorStore::load(path)?;
        self.retrieve(query, &store, top_n).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EmbeddingRecord;

    fn store(entries: &[(&str, Vec<f32>)]) -> VectorStore {
        let mut store = VectorStore::new("m");
        for (text, vector) in entries {
            store
                .push(EmbeddingRecord::new(*text, vector.clone()))
                .unwrap();
        }
        store
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_cosine_similarity_reference_values() {
        assert_close(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_close(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_close(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[3.0, 4.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_ignores_magnitude() {
        assert_close(cosine_similarity(&[1.0, 1.0], &[10.0, 10.0]), 1.0);
        assert_close(
            cosine_similarity(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]),
            32.0 / (14.0f64.sqrt() * 77.0f64.sqrt()),
        );
    }

    #[test]
    fn test_rank_orders_descending() {
        let store = store(&[
            ("different", vec![0.0, 1.0, 0.0]),
            ("anchor", vec![1.0, 0.0, 0.0]),
            ("similar", vec![0.9, 0.1, 0.0]),
            ("opposite", vec![-1.0, 0.0, 0.0]),
        ]);

        let results = rank(&[1.0, 0.0, 0.0], &store, 10).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(order, vec!["anchor", "similar", "different", "opposite"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_truncates_to_top_n() {
        let store = store(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.5, 0.5]),
            ("c", vec![0.0, 1.0]),
        ]);

        let results = rank(&[1.0, 0.0], &store, 2).unwrap();
        assert_eq!(results.len(), 2);

        // Every returned score beats every dropped one.
        let all = rank(&[1.0, 0.0], &store, usize::MAX).unwrap();
        let min_kept = results.iter().map(|r| r.score).fold(f64::INFINITY, f64::min);
        assert!(all[2..].iter().all(|r| r.score <= min_kept));
    }

    #[test]
    fn test_rank_top_n_larger_than_store() {
        let store = store(&[("a", vec![1.0]), ("b", vec![2.0])]);
        assert_eq!(rank(&[1.0], &store, 50).unwrap().len(), 2);
        assert!(rank(&[1.0], &store, 0).unwrap().is_empty());
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let store = store(&[
            ("first", vec![1.0, 0.0]),
            ("low", vec![0.0, 1.0]),
            ("second", vec![2.0, 0.0]),
            ("zero", vec![0.0, 0.0]),
            ("third", vec![3.0, 0.0]),
        ]);

        let results = rank(&[1.0, 0.0], &store, 5).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        // first/second/third all score 1.0; low and zero both score 0.0
        assert_eq!(order, vec!["first", "second", "third", "low", "zero"]);
    }

    #[test]
    fn test_rank_separates_scores_closer_than_f32() {
        // Both score within 3e-8 of 1.0, which is a single f32 value.
        let store = store(&[("wider", vec![1.0, 2e-4]), ("closer", vec![1.0, 1e-4])]);

        let results = rank(&[1.0, 0.0], &store, 2).unwrap();
        assert_eq!(results[0].text, "closer");
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].score as f32, results[1].score as f32);
    }

    #[test]
    fn test_rank_empty_store() {
        let store = VectorStore::new("m");
        assert!(rank(&[1.0, 2.0], &store, 5).unwrap().is_empty());
    }

    #[test]
    fn test_rank_dimension_mismatch() {
        let store = store(&[("a", vec![1.0, 0.0, 0.0])]);
        let err = rank(&[1.0, 0.0], &store, 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    }
}
