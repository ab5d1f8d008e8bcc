//! Shared error type
//!
//! Every subsystem crate defines its own `thiserror` enum and converts into
//! this one at the crate boundary.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced across crate boundaries
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Rag(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure came from an external collaborator that may recover
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Llm(_) | Error::Embedding(_) | Error::Store(_) | Error::Delivery(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Rag("both channels failed".to_string());
        assert_eq!(err.to_string(), "Retrieval error: both channels failed");
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Llm("timeout".into()).is_transient());
        assert!(!Error::InvalidInput("bad".into()).is_transient());
    }
}
