//! Capability traits injected into the pipeline
//!
//! ```text
//! LanguageModel      classification, reranking, generation with tools
//! Embedder           text -> vector
//! CorpusStore        nearest neighbours + keyword search per corpus
//! ConversationStore  message log + burst generation counter
//! ReplySink          outbound delivery
//! OrderLookup        commerce order status
//! Clock              wall time, swappable in tests
//! ```

mod clock;
mod commerce;
mod conversation;
mod llm;
mod retrieval;

pub use clock::{Clock, SystemClock};
pub use commerce::OrderLookup;
pub use conversation::{ConversationStore, ReplySink};
pub use llm::LanguageModel;
pub use retrieval::{CorpusStore, Embedder};
