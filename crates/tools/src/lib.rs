//! Tools offered to the reply model
//!
//! Implements function-calling tools with JSON schemas built from
//! [`ToolBuilder`](support_agent_llm::ToolBuilder):
//! - `search_products`: product waterfall search, exclusions, reranking
//! - `lookup_order`: order status by email and order number

pub mod orders;
pub mod products;
pub mod registry;

pub use orders::{format_order, HttpOrderLookup, LookupOrderTool, LOOKUP_ORDER};
pub use products::{format_product, SearchProductsConfig, SearchProductsTool, SEARCH_PRODUCTS};
pub use registry::{ToolExecutor, ToolRegistry};

use async_trait::async_trait;
use serde_json::Value;
use support_agent_core::{Product, ToolDefinition};
use thiserror::Error;

/// Default timeout for tool execution
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Tool execution errors
///
/// These are fed back to the model as tool messages; they never abort the
/// reply.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool {name} timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        ToolError::InvalidParams(message.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        ToolError::NotFound(name.into())
    }

    pub fn timeout(name: impl Into<String>, secs: u64) -> Self {
        ToolError::Timeout {
            name: name.into(),
            secs,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ToolError::Internal(message.into())
    }
}

impl From<ToolError> for support_agent_core::Error {
    fn from(err: ToolError) -> Self {
        support_agent_core::Error::Tool(err.to_string())
    }
}

/// Result of one tool invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text returned to the model as the tool message
    pub content: String,
    /// Products surfaced by the call, used for rich cards
    pub products: Vec<Product>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            products: Vec::new(),
        }
    }

    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }
}

/// Function-calling tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Schema advertised to the model
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError>;

    fn timeout_secs(&self) -> u64 {
        DEFAULT_TOOL_TIMEOUT_SECS
    }
}

/// Trimmed, non-empty string argument
pub(crate) fn string_arg<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
