//! Regex patterns for the fast path and the fallback classifier

use once_cell::sync::Lazy;
use regex::Regex;
use support_agent_core::IntentLabel;

/// Whole-message small talk, checked only on single-message batches
static SIMPLE_PATTERNS: Lazy<Vec<(IntentLabel, Regex)>> = Lazy::new(|| {
    vec![
        (
            IntentLabel::Greeting,
            Regex::new(r"(?i)^(?:merhaba|selam|hey|hi|hello|günaydın|iyi\s*günler|iyi\s*akşamlar)\s*[!.?]*$")
                .unwrap(),
        ),
        (
            IntentLabel::Thanks,
            Regex::new(r"(?i)^(?:teşekkür(?:ler| ederim)?|sağ\s*ol(?:un)?|thanks|thank\s*you)\s*[!.?]*$")
                .unwrap(),
        ),
        (
            IntentLabel::Farewell,
            Regex::new(r"(?i)^(?:görüşürüz|hoşça\s*kal(?:ın)?|güle\s*güle|bye)\s*[!.?]*$").unwrap(),
        ),
        (
            IntentLabel::Confirmation,
            Regex::new(r"(?i)^(?:evet|hayır|tamam|ok|okay|peki|olur|olmaz|yes|no)\s*[!.?]*$").unwrap(),
        ),
    ]
});

/// Intents detectable anywhere in a batch
static SECONDARY_PATTERNS: Lazy<Vec<(IntentLabel, Regex)>> = Lazy::new(|| {
    vec![
        (
            IntentLabel::Greeting,
            Regex::new(r"(?i)merhaba|selam|günaydın|iyi\s*günler").unwrap(),
        ),
        (IntentLabel::Thanks, Regex::new(r"(?i)teşekkür|sağ\s*ol").unwrap()),
        (IntentLabel::Farewell, Regex::new(r"(?i)görüşürüz|hoşça\s*kal").unwrap()),
        (
            IntentLabel::OrderQuery,
            Regex::new(r"(?i)sipariş|kargo|teslimat|order|shipping").unwrap(),
        ),
        (
            IntentLabel::Complaint,
            Regex::new(r"(?i)şikayet|memnun\s*değil|rezalet|berbat|complaint").unwrap(),
        ),
        (IntentLabel::HumanRequest, HANDOFF.clone()),
    ]
});

/// Requests to talk to a person
static HANDOFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)müşteri\s*temsilci|insan|canlı\s*destek|gerçek\s*(?:bir\s*)?kişi|\bhuman\b|\bagent\b|live\s*support|real\s*person",
    )
    .unwrap()
});

/// Generic shopping words that imply a product question
static GENERAL_PRODUCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)fiyat|ürün|stok|var\s*mı|kaç\s*tl|ne\s*kadar|bedeni?|rengi?|modeli?").unwrap()
});

/// Labels of a single small-talk message, empty when it is not small talk
pub fn simple_intents(message: &str) -> Vec<IntentLabel> {
    let message = message.trim();
    SIMPLE_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(message))
        .map(|(label, _)| *label)
        .collect()
}

pub fn secondary_intents(text: &str) -> Vec<IntentLabel> {
    let text = super::lexicon::fold_case(text);
    SECONDARY_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&text))
        .map(|(label, _)| *label)
        .collect()
}

/// Whether the customer asks for a human agent
pub fn is_handoff_request(text: &str) -> bool {
    HANDOFF.is_match(&super::lexicon::fold_case(text))
}

pub fn mentions_general_product(text: &str) -> bool {
    GENERAL_PRODUCT.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_intents() {
        assert_eq!(simple_intents("Merhaba!"), vec![IntentLabel::Greeting]);
        assert_eq!(simple_intents("teşekkürler"), vec![IntentLabel::Thanks]);
        assert_eq!(simple_intents("tamam."), vec![IntentLabel::Confirmation]);
        assert!(simple_intents("merhaba kolye var mı").is_empty());
    }

    #[test]
    fn test_handoff() {
        assert!(is_handoff_request("Müşteri temsilcisi ile görüşmek istiyorum"));
        assert!(is_handoff_request("İnsan ile konuşabilir miyim"));
        assert!(is_handoff_request("can I talk to a real person"));
        assert!(!is_handoff_request("siyah kolye"));
    }

    #[test]
    fn test_secondary_intents() {
        let labels = secondary_intents("merhaba, siparişim nerede?");
        assert!(labels.contains(&IntentLabel::Greeting));
        assert!(labels.contains(&IntentLabel::OrderQuery));
    }
}
