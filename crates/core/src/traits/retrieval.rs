//! Embedding and corpus store capabilities

use async_trait::async_trait;

use crate::{Corpus, CorpusRecord, Result, ScoredRecord};

/// Text to fixed-length vector
///
/// Implementations must be deterministic for the same input so results can
/// be cached by content hash.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, part of the cache key
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;
}

/// FAQ, document-chunk and product storage
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Cosine nearest neighbours, closest first
    async fn nearest_neighbors(
        &self,
        corpus: Corpus,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>>;

    /// Records whose text contains any of `terms` (case-insensitive)
    async fn keyword_search(
        &self,
        corpus: Corpus,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<CorpusRecord>>;
}
