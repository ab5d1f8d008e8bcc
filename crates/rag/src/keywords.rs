//! Query normalization for the keyword channel
//!
//! Fold case (Turkish `İ` to `i`), strip punctuation, drop stop-words and one-letter tokens,
//! dedupe preserving first occurrence, cap the term count.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use support_agent_text_processing::fold_case;

/// Turkish and English function words
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bir", "ve", "ile", "de", "da", "için", "ne", "nasıl", "nedir", "mi", "mı", "mu", "mü",
        "bu", "şu", "o", "ben", "sen", "biz", "siz", "onlar", "var", "yok", "a", "an", "the",
        "is", "are", "was", "were", "be", "been", "being", "to", "of", "in", "for", "on", "with",
        "at", "by", "from",
    ]
    .into_iter()
    .collect()
});

/// Extra words that carry no signal in catalog searches
static PRODUCT_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["ürün", "ürünler", "fiyat", "fiyatı", "kaç", "kadar", "price", "product", "products"]
        .into_iter()
        .collect()
});

/// Speaker prefixes added when a query is built from conversation context
const ROLE_PREFIXES: [&str; 4] = ["Kullanıcı:", "Asistan:", "User:", "Assistant:"];

/// Normalize a query into at most `max_terms` search terms
pub fn normalize_query(query: &str, max_terms: usize) -> Vec<String> {
    normalize_with(query, max_terms, |_| false)
}

/// Normalize a product search query, dropping catalog filler words too
pub fn normalize_product_query(query: &str, max_terms: usize) -> Vec<String> {
    normalize_with(query, max_terms, |word| PRODUCT_STOPWORDS.contains(word))
}

fn normalize_with(query: &str, max_terms: usize, extra_stop: impl Fn(&str) -> bool) -> Vec<String> {
    let cleaned: String = fold_case(query)
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() >= 2)
        .filter(|word| !STOPWORDS.contains(word) && !extra_stop(word))
        .filter(|word| seen.insert(word.to_string()))
        .take(max_terms)
        .map(str::to_string)
        .collect()
}

/// Reduce a context-aware query to the latest customer line
///
/// Multi-line queries carry conversation context; the last line is the most
/// recent question. Speaker prefixes are removed.
pub fn sanitize_query(query: &str) -> String {
    let last_line = query
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("");

    let mut line = last_line;
    for prefix in ROLE_PREFIXES {
        if let Some(rest) = line.strip_prefix(prefix) {
            line = rest.trim_start();
        }
    }
    line.trim().to_string()
}

/// Number of distinct terms that occur (as substrings) in `text`
pub fn count_term_matches(text: &str, terms: &[String]) -> usize {
    let haystack = fold_case(text);
    terms.iter().filter(|term| haystack.contains(term.as_str())).count()
}
