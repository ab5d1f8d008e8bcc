//! Configuration management for the support agent
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (`SUPPORT_AGENT__` prefix, `__` separator)
//! - Runtime overrides

pub mod agent;
pub mod constants;
pub mod pipeline;
pub mod settings;

pub use agent::AgentConfig;
pub use pipeline::{IntentConfig, RerankerConfig, RetrievalConfig, SchedulerConfig, ValidatorConfig};
pub use settings::{
    load_settings, load_settings_from, CommerceConfig, EmbeddingConfig, LlmSettings,
    ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings, VectorStoreConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for support_agent_core::Error {
    fn from(err: ConfigError) -> Self {
        support_agent_core::Error::Config(err.to_string())
    }
}
