//! Response validation
//!
//! Scores a generated reply before it reaches the customer: confidence
//! (explicit tag or inferred from citations), citation validity against the
//! sources actually supplied, an additive hallucination-risk score, and the
//! cleaned customer-facing text. Validation never fails.

mod tags;

pub use tags::{clean_response_tags, extract_confidence_tag};

use once_cell::sync::Lazy;
use regex::Regex;
use support_agent_config::ValidatorConfig;
use support_agent_core::{
    Citations, ConfidenceLevel, HallucinationRisk, RiskLevel, ValidationResult,
};

use tags::{DOCUMENT_CITATION, FAQ_CITATION};

/// Phrases that mark an explicit "I don't have that information" reply
pub const NO_INFO_PHRASES: &[&str] = &[
    "elimde yeterli bilgi bulunmuyor",
    "bu konuda bilgim yok",
    "müşteri hizmetlerine",
    "bilgi bulunamadı",
    "emin değilim",
    "net bir bilgi veremiyorum",
    "i don't have enough information",
    "i'm not sure",
];

/// Hedging vocabulary, each distinct hit adds to the risk score
const HEDGES: &[&str] = &[
    "genellikle",
    "muhtemelen",
    "sanırım",
    "tahminimce",
    "büyük ihtimalle",
    "normalde",
    "tipik olarak",
    "çoğu zaman",
    "probably",
    "usually",
    "i think",
];

/// Bare quantity claim: price, duration, percentage, weight, length
static NUMERIC_CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+\s*(?:TL|lira|gün|saat|dakika|ay|yıl|%|adet|kg|gram|cm|metre)").unwrap()
});

/// Whether the text contains a no-information phrase
pub fn is_no_info_response(text: &str) -> bool {
    let normalized = text.to_lowercase();
    NO_INFO_PHRASES.iter().any(|phrase| normalized.contains(phrase))
}

pub struct ResponseValidator {
    config: ValidatorConfig,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl ResponseValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate generated text
    ///
    /// `available_faq_ids` are the 1-based indices of the FAQs shown to the
    /// model; `available_document_ids` the ids of the supplied chunks.
    pub fn validate(
        &self,
        text: &str,
        available_faq_ids: &[usize],
        available_document_ids: &[String],
    ) -> ValidationResult {
        let cleaned_text = clean_response_tags(text);
        if text.trim().is_empty() {
            return ValidationResult::conservative(cleaned_text);
        }

        let no_info_response = is_no_info_response(text);
        let citations = extract_citations(text, available_faq_ids.len(), available_document_ids);

        let (confidence, confidence_explicit) = match extract_confidence_tag(text) {
            Some(level) => (level, true),
            None => (infer_confidence(&citations, no_info_response), false),
        };

        let hallucination_risk = self.score_risk(text, &citations, no_info_response);
        metrics::histogram!("support_agent_hallucination_risk")
            .record(f64::from(hallucination_risk.score));

        if citations.has_invalid() {
            tracing::warn!(
                invalid_faq = ?citations.invalid_faq,
                invalid_document = ?citations.invalid_document,
                "Reply cites sources that were not supplied"
            );
        }

        ValidationResult {
            confidence,
            confidence_explicit,
            citations,
            hallucination_risk,
            no_info_response,
            cleaned_text,
        }
    }

    fn score_risk(&self, text: &str, citations: &Citations, no_info: bool) -> HallucinationRisk {
        let mut score: u32 = 0;
        let mut reasons = Vec::new();

        if citations.is_empty() && !no_info {
            score += u32::from(self.config.no_citation_penalty);
            reasons.push("no citations".to_string());
        }

        let normalized = text.to_lowercase();
        let hedges: Vec<&str> = HEDGES
            .iter()
            .copied()
            .filter(|hedge| normalized.contains(hedge))
            .collect();
        if !hedges.is_empty() {
            score += u32::from(self.config.hedge_penalty) * hedges.len() as u32;
            reasons.push(format!("hedging: {}", hedges.join(", ")));
        }

        if citations.is_empty() && NUMERIC_CLAIM.is_match(text) {
            score += u32::from(self.config.numeric_penalty);
            reasons.push("numeric claim without citation".to_string());
        }

        let score = score.min(100) as u8;
        HallucinationRisk {
            score,
            level: self.bucket(score),
            reasons,
        }
    }

    fn bucket(&self, score: u8) -> RiskLevel {
        if score <= self.config.low_max {
            RiskLevel::Low
        } else if score <= self.config.medium_max {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

fn extract_citations(text: &str, faq_count: usize, available_documents: &[String]) -> Citations {
    let mut citations = Citations::default();

    for caps in FAQ_CITATION.captures_iter(text) {
        let Some(index) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        citations.faq.push(index);
        if index == 0 || index > faq_count {
            citations.invalid_faq.push(index);
        }
    }

    for caps in DOCUMENT_CITATION.captures_iter(text) {
        let Some(id) = caps.get(1).map(|m| m.as_str().to_string()) else {
            continue;
        };
        if !available_documents.contains(&id) {
            citations.invalid_document.push(id.clone());
        }
        citations.document.push(id);
    }

    citations
}

fn infer_confidence(citations: &Citations, no_info: bool) -> ConfidenceLevel {
    match (citations.total(), no_info) {
        (0, false) => ConfidenceLevel::Low,
        (0, true) => ConfidenceLevel::Medium,
        (n, _) if n >= 2 => ConfidenceLevel::High,
        _ => ConfidenceLevel::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_out_of_range_faq_citation_is_invalid() {
        let validator = ResponseValidator::default();
        let result = validator.validate("İade süresi 14 gündür [SSS_7].", &[1, 2, 3], &[]);
        assert_eq!(result.citations.faq, vec![7]);
        assert_eq!(result.citations.invalid_faq, vec![7]);
        assert!(result.citations.has_invalid());
    }

    #[test]
    fn test_valid_citations_and_inferred_confidence() {
        let validator = ResponseValidator::default();
        let result = validator.validate(
            "Kargo ücretsizdir [SSS_1] ve 2 gün sürer [DOKÜMAN_42].",
            &[1, 2],
            &docs(&["42"]),
        );
        assert!(!result.citations.has_invalid());
        assert_eq!(result.confidence, ConfidenceLevel::High);
        assert!(!result.confidence_explicit);
        assert_eq!(result.hallucination_risk.score, 0);
        assert_eq!(result.hallucination_risk.level, RiskLevel::Low);
        assert_eq!(result.cleaned_text, "Kargo ücretsizdir  ve 2 gün sürer .");
    }

    #[test]
    fn test_unknown_document_is_invalid() {
        let validator = ResponseValidator::default();
        let result = validator.validate("Bkz. [DOC_99]", &[], &docs(&["1"]));
        assert_eq!(result.citations.invalid_document, vec!["99".to_string()]);
    }

    #[test]
    fn test_explicit_confidence_tag_wins() {
        let validator = ResponseValidator::default();
        let result = validator.validate("Merhaba! [GÜVEN: YÜKSEK]", &[], &[]);
        assert_eq!(result.confidence, ConfidenceLevel::High);
        assert!(result.confidence_explicit);
        assert_eq!(result.cleaned_text, "Merhaba!");
    }

    #[test]
    fn test_risk_is_additive() {
        let validator = ResponseValidator::default();
        // no citation (+40), two hedges (+20), numeric claim (+30)
        let result = validator.validate(
            "Muhtemelen 3 gün içinde gelir, genellikle böyle.",
            &[],
            &[],
        );
        assert_eq!(result.hallucination_risk.score, 90);
        assert_eq!(result.hallucination_risk.level, RiskLevel::High);
        assert_eq!(result.hallucination_risk.reasons.len(), 3);
        assert_eq!(result.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_no_info_reply_is_not_penalized() {
        let validator = ResponseValidator::default();
        let result = validator.validate(
            "Bu konuda elimde yeterli bilgi bulunmuyor. Müşteri hizmetlerine ulaşabilirsiniz.",
            &[],
            &[],
        );
        assert!(result.no_info_response);
        assert_eq!(result.hallucination_risk.score, 0);
        assert_eq!(result.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_risk_buckets() {
        let validator = ResponseValidator::default();
        assert_eq!(validator.bucket(0), RiskLevel::Low);
        assert_eq!(validator.bucket(20), RiskLevel::Low);
        assert_eq!(validator.bucket(21), RiskLevel::Medium);
        assert_eq!(validator.bucket(50), RiskLevel::Medium);
        assert_eq!(validator.bucket(51), RiskLevel::High);
    }

    #[test]
    fn test_empty_text_is_conservative() {
        let validator = ResponseValidator::default();
        let result = validator.validate("   ", &[1], &[]);
        assert_eq!(result.confidence, ConfidenceLevel::Low);
        assert!(result.citations.is_empty());
    }
}
