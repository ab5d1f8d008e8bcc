//! Configuration for the reply pipeline stages
//!
//! One struct per stage: scheduler, intent classifier, hybrid retriever,
//! reranker and response validator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{intent, reranker, retrieval, scheduler, validator};

/// Debounce scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay `D` before an evaluation fires
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,

    /// `MAX_WAIT` ceiling measured from the first message of a burst
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Worker pool size
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_response_delay_ms() -> u64 {
    scheduler::RESPONSE_DELAY_MS
}
fn default_max_wait_ms() -> u64 {
    scheduler::MAX_WAIT_MS
}
fn default_workers() -> usize {
    scheduler::WORKERS
}

impl SchedulerConfig {
    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            response_delay_ms: default_response_delay_ms(),
            max_wait_ms: default_max_wait_ms(),
            workers: default_workers(),
        }
    }
}

/// Intent classifier settings
///
/// Lexicon weights and thresholds are calibration knobs, not fixed truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    #[serde(default = "default_category_weight")]
    pub category_weight: u8,
    #[serde(default = "default_attribute_weight")]
    pub attribute_weight: u8,
    #[serde(default = "default_color_weight")]
    pub color_weight: u8,
    #[serde(default = "default_color_only_cap")]
    pub color_only_cap: u8,
    #[serde(default = "default_attribute_only_cap")]
    pub attribute_only_cap: u8,
    #[serde(default = "default_direct_threshold")]
    pub direct_threshold: u8,
    #[serde(default = "default_clarify_threshold")]
    pub clarify_threshold: u8,
    /// Conversation turns passed to the LLM tier
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
    #[serde(default = "default_intent_keywords")]
    pub max_keywords: usize,
    /// Model override for classification calls
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_llm_temperature")]
    pub llm_temperature: f32,
    #[serde(default = "default_llm_max_tokens")]
    pub llm_max_tokens: u32,
}

fn default_category_weight() -> u8 {
    intent::CATEGORY_WEIGHT
}
fn default_attribute_weight() -> u8 {
    intent::ATTRIBUTE_WEIGHT
}
fn default_color_weight() -> u8 {
    intent::COLOR_WEIGHT
}
fn default_color_only_cap() -> u8 {
    intent::COLOR_ONLY_CAP
}
fn default_attribute_only_cap() -> u8 {
    intent::ATTRIBUTE_ONLY_CAP
}
fn default_direct_threshold() -> u8 {
    intent::DIRECT_THRESHOLD
}
fn default_clarify_threshold() -> u8 {
    intent::CLARIFY_THRESHOLD
}
fn default_context_turns() -> usize {
    intent::CONTEXT_TURNS
}
fn default_intent_keywords() -> usize {
    intent::MAX_KEYWORDS
}
fn default_llm_temperature() -> f32 {
    intent::LLM_TEMPERATURE
}
fn default_llm_max_tokens() -> u32 {
    intent::LLM_MAX_TOKENS
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            category_weight: default_category_weight(),
            attribute_weight: default_attribute_weight(),
            color_weight: default_color_weight(),
            color_only_cap: default_color_only_cap(),
            attribute_only_cap: default_attribute_only_cap(),
            direct_threshold: default_direct_threshold(),
            clarify_threshold: default_clarify_threshold(),
            context_turns: default_context_turns(),
            max_keywords: default_intent_keywords(),
            model: None,
            llm_temperature: default_llm_temperature(),
            llm_max_tokens: default_llm_max_tokens(),
        }
    }
}

/// Hybrid retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
    /// Semantic similarity floor
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    #[serde(default = "default_retrieval_keywords")]
    pub max_keywords: usize,
    #[serde(default = "default_faq_limit")]
    pub faq_limit: usize,
    #[serde(default = "default_document_limit")]
    pub document_limit: usize,
    #[serde(default = "default_product_limit")]
    pub product_limit: usize,
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
}

fn default_rrf_k() -> f32 {
    retrieval::RRF_K
}
fn default_semantic_weight() -> f32 {
    retrieval::SEMANTIC_WEIGHT
}
fn default_keyword_weight() -> f32 {
    retrieval::KEYWORD_WEIGHT
}
fn default_min_similarity() -> f32 {
    retrieval::MIN_SIMILARITY
}
fn default_retrieval_keywords() -> usize {
    retrieval::MAX_KEYWORDS
}
fn default_faq_limit() -> usize {
    retrieval::FAQ_LIMIT
}
fn default_document_limit() -> usize {
    retrieval::DOCUMENT_LIMIT
}
fn default_product_limit() -> usize {
    retrieval::PRODUCT_LIMIT
}
fn default_candidate_multiplier() -> usize {
    retrieval::CANDIDATE_MULTIPLIER
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            min_similarity: default_min_similarity(),
            max_keywords: default_retrieval_keywords(),
            faq_limit: default_faq_limit(),
            document_limit: default_document_limit(),
            product_limit: default_product_limit(),
            candidate_multiplier: default_candidate_multiplier(),
        }
    }
}

/// LLM reranker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Candidates retrieved before reranking
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    #[serde(default = "default_final_limit")]
    pub final_limit: usize,
    #[serde(default = "default_description_chars")]
    pub description_chars: usize,
    #[serde(default = "default_rerank_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_candidate_pool() -> usize {
    reranker::CANDIDATE_POOL
}
fn default_final_limit() -> usize {
    reranker::FINAL_LIMIT
}
fn default_description_chars() -> usize {
    reranker::DESCRIPTION_CHARS
}
fn default_rerank_max_tokens() -> u32 {
    reranker::MAX_TOKENS
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            candidate_pool: default_candidate_pool(),
            final_limit: default_final_limit(),
            description_chars: default_description_chars(),
            max_tokens: default_rerank_max_tokens(),
            model: None,
        }
    }
}

/// Response validator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_no_citation_penalty")]
    pub no_citation_penalty: u8,
    #[serde(default = "default_hedge_penalty")]
    pub hedge_penalty: u8,
    #[serde(default = "default_numeric_penalty")]
    pub numeric_penalty: u8,
    #[serde(default = "default_low_max")]
    pub low_max: u8,
    #[serde(default = "default_medium_max")]
    pub medium_max: u8,
}

fn default_no_citation_penalty() -> u8 {
    validator::NO_CITATION_PENALTY
}
fn default_hedge_penalty() -> u8 {
    validator::HEDGE_PENALTY
}
fn default_numeric_penalty() -> u8 {
    validator::NUMERIC_PENALTY
}
fn default_low_max() -> u8 {
    validator::LOW_MAX
}
fn default_medium_max() -> u8 {
    validator::MEDIUM_MAX
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            no_citation_penalty: default_no_citation_penalty(),
            hedge_penalty: default_hedge_penalty(),
            numeric_penalty: default_numeric_penalty(),
            low_max: default_low_max(),
            medium_max: default_medium_max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_durations() {
        let config = SchedulerConfig::default();
        assert_eq!(config.response_delay(), Duration::from_secs(3));
        assert_eq!(config.max_wait(), Duration::from_secs(15));
    }

    #[test]
    fn test_retrieval_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.rrf_k, 60.0);
        assert!(config.semantic_weight > config.keyword_weight);
        assert_eq!(config.max_keywords, 10);
    }

    #[test]
    fn test_intent_defaults() {
        let config = IntentConfig::default();
        assert_eq!(
            (config.category_weight, config.attribute_weight, config.color_weight),
            (50, 30, 20)
        );
        assert_eq!((config.direct_threshold, config.clarify_threshold), (70, 40));
    }
}
