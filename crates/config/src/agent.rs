//! Reply composition configuration

use serde::{Deserialize, Serialize};

use crate::constants::agent;

/// Settings for the reply composer and delivery decisions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Assistant display name used in the system prompt
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Optional business description appended to the system prompt
    #[serde(default)]
    pub business_description: Option<String>,

    /// Maximum tool-calling rounds per reply
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// History turns included in generation and the context-aware query
    #[serde(default = "default_max_history")]
    pub max_history_messages: usize,

    #[serde(default = "default_card_limit")]
    pub product_card_limit: usize,

    #[serde(default = "default_whatsapp_card_limit")]
    pub whatsapp_card_limit: usize,

    /// Truncation of product descriptions in tool output
    #[serde(default = "default_description_chars")]
    pub product_description_chars: usize,

    /// Route "talk to a human" requests to an agent instead of answering
    #[serde(default = "default_true")]
    pub handoff_enabled: bool,

    /// Offer the order lookup tool
    #[serde(default = "default_true")]
    pub order_lookup_enabled: bool,

    /// Offer the product search tool
    #[serde(default = "default_true")]
    pub product_search_enabled: bool,

    /// Sampling temperature for reply generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_assistant_name() -> String {
    "Asistan".to_string()
}
fn default_max_tool_rounds() -> usize {
    agent::MAX_TOOL_ROUNDS
}
fn default_max_history() -> usize {
    agent::MAX_HISTORY_MESSAGES
}
fn default_card_limit() -> usize {
    agent::PRODUCT_CARD_LIMIT
}
fn default_whatsapp_card_limit() -> usize {
    agent::WHATSAPP_CARD_LIMIT
}
fn default_description_chars() -> usize {
    agent::PRODUCT_DESCRIPTION_CHARS
}
fn default_true() -> bool {
    true
}
fn default_temperature() -> f32 {
    0.3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            business_description: None,
            max_tool_rounds: default_max_tool_rounds(),
            max_history_messages: default_max_history(),
            product_card_limit: default_card_limit(),
            whatsapp_card_limit: default_whatsapp_card_limit(),
            product_description_chars: default_description_chars(),
            handoff_enabled: true,
            order_lookup_enabled: true,
            product_search_enabled: true,
            temperature: default_temperature(),
        }
    }
}
