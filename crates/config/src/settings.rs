//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{embedding, endpoints};
use crate::{
    AgentConfig, ConfigError, IntentConfig, RerankerConfig, RetrievalConfig, SchedulerConfig,
    ValidatorConfig,
};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub intent: IntentConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub reranker: RerankerConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub commerce: CommerceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Reject inconsistent values before anything is wired up
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_scheduler()?;
        self.validate_intent()?;
        self.validate_retrieval()?;
        self.validate_validator()?;
        self.validate_server()?;

        if self.environment.is_production() && self.llm.api_key.is_none() {
            return Err(ConfigError::MissingField("llm.api_key".to_string()));
        }

        Ok(())
    }

    fn validate_scheduler(&self) -> Result<(), ConfigError> {
        let scheduler = &self.scheduler;
        if scheduler.max_wait_ms < scheduler.response_delay_ms {
            return Err(ConfigError::invalid(
                "scheduler.max_wait_ms",
                format!(
                    "Must be at least response_delay_ms ({}), got {}",
                    scheduler.response_delay_ms, scheduler.max_wait_ms
                ),
            ));
        }
        if scheduler.workers == 0 {
            return Err(ConfigError::invalid("scheduler.workers", "Must be positive"));
        }
        Ok(())
    }

    fn validate_intent(&self) -> Result<(), ConfigError> {
        let intent = &self.intent;
        if intent.clarify_threshold > intent.direct_threshold {
            return Err(ConfigError::invalid(
                "intent.clarify_threshold",
                format!(
                    "Must not exceed direct_threshold ({}), got {}",
                    intent.direct_threshold, intent.clarify_threshold
                ),
            ));
        }
        if intent.direct_threshold > 100 {
            return Err(ConfigError::invalid(
                "intent.direct_threshold",
                "Must be between 0 and 100",
            ));
        }
        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let retrieval = &self.retrieval;
        for (field, value) in [
            ("retrieval.semantic_weight", retrieval.semantic_weight),
            ("retrieval.keyword_weight", retrieval.keyword_weight),
            ("retrieval.min_similarity", retrieval.min_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("Must be between 0.0 and 1.0, got {}", value),
                ));
            }
        }
        if retrieval.rrf_k <= 0.0 {
            return Err(ConfigError::invalid(
                "retrieval.rrf_k",
                format!("Must be positive, got {}", retrieval.rrf_k),
            ));
        }
        if retrieval.candidate_multiplier == 0 {
            return Err(ConfigError::invalid(
                "retrieval.candidate_multiplier",
                "Must be positive",
            ));
        }
        if self.reranker.final_limit > self.reranker.candidate_pool {
            return Err(ConfigError::invalid(
                "reranker.final_limit",
                "Must not exceed reranker.candidate_pool",
            ));
        }
        Ok(())
    }

    fn validate_validator(&self) -> Result<(), ConfigError> {
        if self.validator.low_max >= self.validator.medium_max {
            return Err(ConfigError::invalid(
                "validator.low_max",
                "Must be below validator.medium_max",
            ));
        }
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Must be non-zero"));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Chat completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    /// Model used for reply generation
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Cheaper model for classification and reranking
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    endpoints::OPENAI_API.to_string()
}
fn default_api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok()
}
fn default_chat_model() -> String {
    endpoints::CHAT_MODEL.to_string()
}
fn default_classifier_model() -> String {
    endpoints::CLASSIFIER_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: default_api_key(),
            model: default_chat_model(),
            classifier_model: default_classifier_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Embedding service and cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    endpoints::EMBEDDING_MODEL.to_string()
}
fn default_dimensions() -> usize {
    embedding::DIMENSIONS
}
fn default_cache_ttl() -> u64 {
    embedding::CACHE_TTL_SECS
}
fn default_cache_capacity() -> u64 {
    embedding::CACHE_CAPACITY
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: default_api_key(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Vector store connection
///
/// Without a `qdrant_url` the server runs on the in-memory corpus store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub qdrant_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Collections are named `{prefix}_faq`, `{prefix}_document`, `{prefix}_product`
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,

    /// JSON seed file for the in-memory store
    #[serde(default)]
    pub seed_path: Option<String>,
}

fn default_collection_prefix() -> String {
    "support".to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            qdrant_url: None,
            api_key: None,
            collection_prefix: default_collection_prefix(),
            seed_path: None,
        }
    }
}

/// Commerce backend used by the order lookup tool
///
/// Without an `orders_endpoint` the `lookup_order` tool is not offered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommerceConfig {
    /// Base URL, orders are fetched from `{orders_endpoint}/orders`
    #[serde(default)]
    pub orders_endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_commerce_timeout")]
    pub timeout_secs: u64,
}

fn default_commerce_timeout() -> u64 {
    10
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            orders_endpoint: None,
            api_key: None,
            timeout_secs: default_commerce_timeout(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/` relative to the working directory
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from a config directory
///
/// Sources in order of precedence (last wins):
/// 1. `{dir}/default.{toml,yaml,json}`
/// 2. `{dir}/{env}.{toml,yaml,json}`
/// 3. `SUPPORT_AGENT__SECTION__FIELD` environment variables
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_path = dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    if let Some(env_name) = env {
        let env_path = dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("SUPPORT_AGENT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
