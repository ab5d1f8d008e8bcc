//! Validation result attached to every generated reply

use serde::{Deserialize, Serialize};

/// Self-reported or inferred answer confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Hallucination risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Citation markers found in generated text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citations {
    /// 1-based FAQ indices
    pub faq: Vec<usize>,
    pub document: Vec<String>,
    /// FAQ indices outside the supplied FAQ list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_faq: Vec<usize>,
    /// Document ids that were never supplied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_document: Vec<String>,
}

impl Citations {
    pub fn total(&self) -> usize {
        self.faq.len() + self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn has_invalid(&self) -> bool {
        !self.invalid_faq.is_empty() || !self.invalid_document.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationRisk {
    /// 0-100
    pub score: u8,
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub confidence: ConfidenceLevel,
    /// Whether the confidence came from an explicit tag
    pub confidence_explicit: bool,
    pub citations: Citations,
    pub hallucination_risk: HallucinationRisk,
    /// Reply is an "I don't have that information" answer
    pub no_info_response: bool,
    pub cleaned_text: String,
}

impl ValidationResult {
    /// Result used when nothing could be extracted
    pub fn conservative(cleaned_text: impl Into<String>) -> Self {
        Self {
            confidence: ConfidenceLevel::Low,
            confidence_explicit: false,
            citations: Citations::default(),
            hallucination_risk: HallucinationRisk {
                score: 0,
                level: RiskLevel::Low,
                reasons: Vec::new(),
            },
            no_info_response: false,
            cleaned_text: cleaned_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_counts() {
        let citations = Citations {
            faq: vec![1, 2],
            document: vec!["7".into()],
            invalid_faq: vec![9],
            invalid_document: vec![],
        };
        assert_eq!(citations.total(), 3);
        assert!(citations.has_invalid());
    }

    #[test]
    fn test_conservative_result() {
        let result = ValidationResult::conservative("text");
        assert_eq!(result.confidence, ConfidenceLevel::Low);
        assert!(result.citations.is_empty());
        assert_eq!(result.cleaned_text, "text");
    }
}
