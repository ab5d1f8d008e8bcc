//! Intent taxonomy and classification result

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Closed set of intents the classifier may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    Greeting,
    Farewell,
    Thanks,
    ProductQuery,
    OrderQuery,
    GeneralQuestion,
    Complaint,
    HumanRequest,
    Confirmation,
    ClarificationNeeded,
    Other,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 11] = [
        IntentLabel::Greeting,
        IntentLabel::Farewell,
        IntentLabel::Thanks,
        IntentLabel::ProductQuery,
        IntentLabel::OrderQuery,
        IntentLabel::GeneralQuestion,
        IntentLabel::Complaint,
        IntentLabel::HumanRequest,
        IntentLabel::Confirmation,
        IntentLabel::ClarificationNeeded,
        IntentLabel::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::Greeting => "greeting",
            IntentLabel::Farewell => "farewell",
            IntentLabel::Thanks => "thanks",
            IntentLabel::ProductQuery => "product_query",
            IntentLabel::OrderQuery => "order_query",
            IntentLabel::GeneralQuestion => "general_question",
            IntentLabel::Complaint => "complaint",
            IntentLabel::HumanRequest => "human_request",
            IntentLabel::Confirmation => "confirmation",
            IntentLabel::ClarificationNeeded => "clarification_needed",
            IntentLabel::Other => "other",
        }
    }

    /// Small-talk intents that never need retrieval
    pub fn is_conversational(&self) -> bool {
        matches!(
            self,
            IntentLabel::Greeting
                | IntentLabel::Farewell
                | IntentLabel::Thanks
                | IntentLabel::Confirmation
        )
    }
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        IntentLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| format!("unknown intent label: {}", s))
    }
}

/// Output of one classification pass over a pending batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intents: BTreeSet<IntentLabel>,
    /// Lexicon confidence, 0-100
    pub confidence: u8,
    pub product_keywords: Vec<String>,
    /// Pending batch joined into one query
    pub combined_query: String,
    /// Whether earlier turns were used to resolve the intent
    pub uses_context: bool,
    /// Disambiguating question when the intent is `clarification_needed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
}

impl IntentResult {
    pub fn new(intents: impl IntoIterator<Item = IntentLabel>, combined_query: impl Into<String>) -> Self {
        Self {
            intents: intents.into_iter().collect(),
            confidence: 0,
            product_keywords: Vec::new(),
            combined_query: combined_query.into(),
            uses_context: false,
            clarification: None,
        }
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.product_keywords = keywords;
        self
    }

    pub fn with_context(mut self, uses_context: bool) -> Self {
        self.uses_context = uses_context;
        self
    }

    pub fn with_clarification(mut self, question: impl Into<String>) -> Self {
        self.clarification = Some(question.into());
        self
    }

    pub fn has(&self, label: IntentLabel) -> bool {
        self.intents.contains(&label)
    }

    /// True when every detected intent is small talk
    pub fn is_conversational_only(&self) -> bool {
        !self.intents.is_empty() && self.intents.iter().all(IntentLabel::is_conversational)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip_names() {
        for label in IntentLabel::ALL {
            assert_eq!(label.as_str().parse::<IntentLabel>(), Ok(label));
        }
        assert!("PRODUCT_QUERY".parse::<IntentLabel>().is_ok());
        assert!("shopping".parse::<IntentLabel>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&IntentLabel::ClarificationNeeded).unwrap();
        assert_eq!(json, "\"clarification_needed\"");
    }

    #[test]
    fn test_conversational_only() {
        let result = IntentResult::new([IntentLabel::Greeting, IntentLabel::Thanks], "selam");
        assert!(result.is_conversational_only());

        let result = IntentResult::new([IntentLabel::Greeting, IntentLabel::ProductQuery], "selam kolye");
        assert!(!result.is_conversational_only());

        let empty = IntentResult::new([], "");
        assert!(!empty.is_conversational_only());
    }

    #[test]
    fn test_confidence_clamped() {
        let result = IntentResult::new([IntentLabel::ProductQuery], "x").with_confidence(250);
        assert_eq!(result.confidence, 100);
    }
}
