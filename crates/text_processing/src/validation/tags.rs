//! Internal markup emitted by the reply model
//!
//! Confidence tags (`[GÜVEN: YÜKSEK]`, `[CONFIDENCE: HIGH]`), citation tags
//! (`[SSS_2]`, `[FAQ_2]`, `[DOKÜMAN_abc]`, `[DOC_abc]`), product markers
//! (`[ÜRÜN_1]`) and markdown that chat channels render literally.

use once_cell::sync::Lazy;
use regex::Regex;
use support_agent_core::ConfidenceLevel;

pub(crate) static CONFIDENCE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[\s*(?:GÜVEN|CONFIDENCE)\s*:\s*(YÜKSEK|ORTA|DÜŞÜK|HIGH|MEDIUM|LOW)\s*\]")
        .unwrap()
});

pub(crate) static FAQ_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(?:SSS|FAQ)_(\d+)\]").unwrap());

pub(crate) static DOCUMENT_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(?:DOKÜMAN|DOC)_([\w-]+)\]").unwrap());

static BARE_FAQ_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[(?:SSS|FAQ)\]").unwrap());

static PRODUCT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(?:ÜRÜN|PRODUCT)_\d+\]").unwrap());

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());

static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());

static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());

static ANYTHING_ELSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:Başka bir konuda yardımcı olabilir miyim|Is there anything else I can help (?:you )?with)\??")
        .unwrap()
});

static EXTRA_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").unwrap());

static TRAILING_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());

/// First explicit confidence tag, if any
pub fn extract_confidence_tag(text: &str) -> Option<ConfidenceLevel> {
    let caps = CONFIDENCE_TAG.captures(text)?;
    let level = caps.get(1)?.as_str().to_lowercase();
    match level.as_str() {
        "yüksek" | "high" => Some(ConfidenceLevel::High),
        "orta" | "medium" => Some(ConfidenceLevel::Medium),
        "düşük" | "low" => Some(ConfidenceLevel::Low),
        _ => None,
    }
}

/// Strip internal markup to produce customer-facing text
///
/// Idempotent: cleaning already-clean text returns it unchanged. Removing
/// one tag can expose another, so passes repeat until nothing changes; every
/// substitution shortens the text, which bounds the loop.
pub fn clean_response_tags(text: &str) -> String {
    let mut current = clean_once(text);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let text = CONFIDENCE_TAG.replace_all(text, "");
    let text = FAQ_CITATION.replace_all(&text, "");
    let text = BARE_FAQ_TAG.replace_all(&text, "");
    let text = DOCUMENT_CITATION.replace_all(&text, "");
    let text = PRODUCT_TAG.replace_all(&text, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = ANYTHING_ELSE.replace_all(&text, "");
    let text = TRAILING_SPACES.replace_all(&text, "\n");
    let text = EXTRA_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_confidence_tag() {
        assert_eq!(
            extract_confidence_tag("Cevap [GÜVEN: YÜKSEK]"),
            Some(ConfidenceLevel::High)
        );
        assert_eq!(
            extract_confidence_tag("[güven:düşük] bilmiyorum"),
            Some(ConfidenceLevel::Low)
        );
        assert_eq!(
            extract_confidence_tag("[CONFIDENCE: medium]"),
            Some(ConfidenceLevel::Medium)
        );
        assert_eq!(extract_confidence_tag("no tag"), None);
    }

    #[test]
    fn test_clean_strips_markup() {
        let raw = "**Kargo** süresi 2 gündür [SSS_1]. Detaylar için [buraya](https://x.y) bakın [DOKÜMAN_12].\n\n\n\n[GÜVEN: YÜKSEK]\nBaşka bir konuda yardımcı olabilir miyim?";
        assert_eq!(
            clean_response_tags(raw),
            "Kargo süresi 2 gündür . Detaylar için buraya bakın ."
        );
    }

    #[test]
    fn test_clean_product_markers() {
        let raw = "[ÜRÜN_1] *Siyah Kolye* - 199 TL [SSS]";
        assert_eq!(clean_response_tags(raw), "Siyah Kolye - 199 TL");
    }

    #[test]
    fn test_clean_unwraps_deeply_nested_citations() {
        let raw = "[SS[SS[SS[SS[SS[SS[SS[SSS]S_1]S_1]S_1]S_1]S_1]S_1]S_1] metin";
        assert_eq!(clean_response_tags(raw), "metin");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "**a** *b* [SSS_1] [GÜVEN: ORTA]\n\n\n\nson",
            "[SS[SSS]S_1] iç içe",
            "[SS[SS[SS[SS[SS[SS[SS[SSS]S_1]S_1]S_1]S_1]S_1]S_1]S_1] metin",
            "***vurgulu*** [t](u)",
            "düz metin",
            "",
        ];
        for raw in samples {
            let once = clean_response_tags(raw);
            assert_eq!(clean_response_tags(&once), once, "input: {:?}", raw);
        }
    }
}
