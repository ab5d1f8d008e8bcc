//! Support Agent Server
//!
//! HTTP surface for the reply agent: inbound-message webhook, conversation
//! log, health and readiness probes, Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use support_agent_agent::AgentError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Agent(_) | ServerError::Metrics(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ServerError> for support_agent_core::Error {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(msg) => support_agent_core::Error::InvalidInput(msg),
            ServerError::NotFound(msg) => support_agent_core::Error::NotFound(msg),
            other => support_agent_core::Error::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status() {
        assert_eq!(
            StatusCode::from(ServerError::InvalidRequest("empty content".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Agent(AgentError::EmptyReply).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_error_conversion() {
        let err: support_agent_core::Error = ServerError::NotFound("conversation c1".into()).into();
        assert!(matches!(err, support_agent_core::Error::NotFound(_)));
    }
}
