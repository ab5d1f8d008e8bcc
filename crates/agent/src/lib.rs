//! Reply orchestration
//!
//! Features:
//! - Debounced scheduling of inbound bursts with a per-burst generation
//!   counter and a hard `max_wait` liveness ceiling
//! - Exhaustive intent plan table deciding retrieval, tools and templates
//! - Reply composition with FAQ/document grounding and a bounded tool loop
//! - In-memory conversation store and delivery sink

pub mod clock;
pub mod composer;
pub mod plan;
pub mod scheduler;
pub mod store;

pub use clock::TokioClock;
pub use composer::{ComposedReply, ReplyComposer};
pub use plan::{Grounding, ReplyPlan, Template};
pub use scheduler::{Outcome, ResponseScheduler};
pub use store::InMemoryConversationStore;

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Tool loop did not settle after {0} rounds")]
    ToolLoopExhausted(usize),

    #[error("Model returned an empty reply")]
    EmptyReply,
}

impl From<support_agent_core::Error> for AgentError {
    fn from(err: support_agent_core::Error) -> Self {
        use support_agent_core::Error;
        match err {
            Error::Llm(msg) => AgentError::Llm(msg),
            Error::Tool(msg) => AgentError::Tool(msg),
            Error::Delivery(msg) => AgentError::Delivery(msg),
            other => AgentError::Store(other.to_string()),
        }
    }
}

impl From<AgentError> for support_agent_core::Error {
    fn from(err: AgentError) -> Self {
        use support_agent_core::Error;
        match err {
            AgentError::Llm(msg) => Error::Llm(msg),
            AgentError::Tool(msg) => Error::Tool(msg),
            AgentError::Delivery(msg) => Error::Delivery(msg),
            AgentError::Store(msg) => Error::Store(msg),
            other => Error::Internal(other.to_string()),
        }
    }
}
