//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use support_agent_agent::{InMemoryConversationStore, ResponseScheduler};
use support_agent_config::Settings;
use support_agent_core::LanguageModel;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Conversation log, also the reply sink the scheduler delivers to
    pub conversations: Arc<InMemoryConversationStore>,
    pub scheduler: ResponseScheduler,
    /// Chat backend, probed by the readiness check
    pub llm: Arc<dyn LanguageModel>,
    /// Names of the tools offered to the model
    pub tools: Arc<Vec<String>>,
    /// `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Settings,
        conversations: Arc<InMemoryConversationStore>,
        scheduler: ResponseScheduler,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            conversations,
            scheduler,
            llm,
            tools: Arc::new(Vec::new()),
            metrics: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
