//! Core traits and types for the support agent
//!
//! This crate provides foundational types used across all other crates:
//! - Capability traits for pluggable collaborators (LLM, embeddings, stores)
//! - Intent taxonomy and classification results
//! - Corpus records and retrieval candidates
//! - Validation results and outbound payloads
//! - Error types

pub mod conversation;
pub mod corpus;
pub mod error;
pub mod intent;
pub mod llm_types;
pub mod order;
pub mod traits;
pub mod validation;

pub use conversation::{
    BurstState, BurstTicket, Channel, ConversationMessage, MessageDirection, Outbound, ProductCard,
};
pub use corpus::{
    Corpus, CorpusRecord, DocumentChunk, FaqEntry, MatchSource, Product, RetrievalCandidate,
    ScoredRecord,
};
pub use error::{Error, Result};
pub use intent::{IntentLabel, IntentResult};
pub use llm_types::{
    FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage, ToolCall,
    ToolDefinition,
};
pub use order::{FulfillmentStatus, OrderSummary, TrackingInfo};
pub use validation::{Citations, ConfidenceLevel, HallucinationRisk, RiskLevel, ValidationResult};

pub use traits::{
    Clock, ConversationStore, CorpusStore, Embedder, LanguageModel, OrderLookup, ReplySink,
    SystemClock,
};
