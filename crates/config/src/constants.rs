//! Centralized defaults for the support pipeline
//!
//! Single source of truth for tunables. Config structs read their `Default`
//! values from here so files and code never drift apart.

/// Debounce scheduling
pub mod scheduler {
    /// Quiet period before a burst is answered
    pub const RESPONSE_DELAY_MS: u64 = 3_000;

    /// Hard ceiling after the first message of a burst; forces a reply
    pub const MAX_WAIT_MS: u64 = 15_000;

    /// Concurrent evaluations across all conversations
    pub const WORKERS: usize = 16;
}

/// Intent classification
pub mod intent {
    pub const CATEGORY_WEIGHT: u8 = 50;
    pub const ATTRIBUTE_WEIGHT: u8 = 30;
    pub const COLOR_WEIGHT: u8 = 20;

    /// Score ceiling when only color terms matched
    pub const COLOR_ONLY_CAP: u8 = 25;

    /// Score ceiling when only attribute terms matched
    pub const ATTRIBUTE_ONLY_CAP: u8 = 35;

    /// At or above: product query, retrieve directly
    pub const DIRECT_THRESHOLD: u8 = 70;

    /// At or above (and below direct): ask a clarifying question
    pub const CLARIFY_THRESHOLD: u8 = 40;

    /// Conversation turns handed to the LLM tier
    pub const CONTEXT_TURNS: usize = 10;

    /// Product keywords kept per classification
    pub const MAX_KEYWORDS: usize = 5;

    pub const LLM_TEMPERATURE: f32 = 0.1;
    pub const LLM_MAX_TOKENS: u32 = 300;
}

/// Hybrid retrieval
pub mod retrieval {
    /// RRF rank damping constant
    pub const RRF_K: f32 = 60.0;

    pub const SEMANTIC_WEIGHT: f32 = 0.6;
    pub const KEYWORD_WEIGHT: f32 = 0.4;

    /// Semantic hits below this cosine similarity are discarded
    pub const MIN_SIMILARITY: f32 = 0.3;

    /// Normalized query terms kept for the keyword channel
    pub const MAX_KEYWORDS: usize = 10;

    pub const FAQ_LIMIT: usize = 5;
    pub const DOCUMENT_LIMIT: usize = 5;
    pub const PRODUCT_LIMIT: usize = 5;

    /// Each channel fetches `limit * CANDIDATE_MULTIPLIER`
    pub const CANDIDATE_MULTIPLIER: usize = 2;
}

/// LLM reranking
pub mod reranker {
    pub const CANDIDATE_POOL: usize = 15;
    pub const FINAL_LIMIT: usize = 5;
    pub const DESCRIPTION_CHARS: usize = 150;
    pub const MAX_TOKENS: u32 = 200;
}

/// Hallucination scoring
pub mod validator {
    pub const NO_CITATION_PENALTY: u8 = 40;
    pub const HEDGE_PENALTY: u8 = 10;
    pub const NUMERIC_PENALTY: u8 = 30;

    /// Upper bound of the low-risk bucket (inclusive)
    pub const LOW_MAX: u8 = 20;

    /// Upper bound of the medium-risk bucket (inclusive)
    pub const MEDIUM_MAX: u8 = 50;
}

/// Reply composition
pub mod agent {
    pub const MAX_TOOL_ROUNDS: usize = 3;
    pub const MAX_HISTORY_MESSAGES: usize = 10;
    pub const PRODUCT_CARD_LIMIT: usize = 10;
    pub const WHATSAPP_CARD_LIMIT: usize = 3;
    pub const PRODUCT_DESCRIPTION_CHARS: usize = 300;
}

/// Embedding cache
pub mod embedding {
    /// Seven days
    pub const CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;
    pub const CACHE_CAPACITY: u64 = 50_000;
    pub const DIMENSIONS: usize = 1536;
}

/// Service endpoints
pub mod endpoints {
    pub const OPENAI_API: &str = "https://api.openai.com/v1";
    pub const QDRANT_DEFAULT: &str = "http://localhost:6334";
    pub const CHAT_MODEL: &str = "gpt-4o";
    pub const CLASSIFIER_MODEL: &str = "gpt-4o-mini";
    pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
}
