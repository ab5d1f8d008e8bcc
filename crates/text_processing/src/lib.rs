//! Text analysis for the support pipeline
//!
//! This crate provides:
//! - **Intent classification**: tiered multi-intent detection over a pending
//!   message batch (fast path, lexicon scoring, LLM, regex fallback)
//! - **Response validation**: confidence, citation checks, hallucination
//!   risk and tag cleanup for generated replies
//!
//! # Example
//!
//! ```ignore
//! use support_agent_text_processing::{IntentClassifier, ResponseValidator};
//!
//! let classifier = IntentClassifier::new(IntentConfig::default(), Some(llm));
//! let intent = classifier.classify(&pending, &history).await;
//!
//! let validation = ResponseValidator::default().validate(&reply, &[1, 2], &[]);
//! ```

pub mod intent;
pub mod validation;

pub use intent::lexicon::fold_case;
pub use intent::{is_handoff_request, ClassifierTier, IntentClassifier, LexiconScore};
pub use validation::{
    clean_response_tags, extract_confidence_tag, is_no_info_response, ResponseValidator,
};
