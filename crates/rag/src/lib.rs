//! Retrieval over the FAQ, document and product corpora
//!
//! Features:
//! - Semantic channel via an injected embedder and corpus store
//! - Keyword channel with Turkish/English query normalization
//! - Weighted RRF fusion for FAQs and documents
//! - Keyword-match waterfall for products
//! - LLM reranking with `exclude_terms` post-filtering
//! - TTL embedding cache keyed by content hash
//! - In-memory and Qdrant corpus stores

pub mod cache;
pub mod embeddings;
pub mod keywords;
pub mod memory_store;
pub mod reranker;
pub mod retriever;
pub mod vector_store;

pub use cache::{CacheStats, CachedEmbedder};
pub use embeddings::{HttpEmbedder, HttpEmbeddingConfig};
pub use keywords::{count_term_matches, normalize_product_query, normalize_query, sanitize_query};
pub use memory_store::{CorpusSeed, InMemoryCorpusStore};
pub use reranker::{apply_exclusions, parse_exclude_terms, CandidateReranker, FallbackReason};
pub use retriever::{waterfall_merge, HybridRetriever, RetrieverConfig};
pub use vector_store::{QdrantCorpusStore, QdrantStoreConfig};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for support_agent_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Embedding(msg) => support_agent_core::Error::Embedding(msg),
            other => support_agent_core::Error::Rag(other.to_string()),
        }
    }
}
