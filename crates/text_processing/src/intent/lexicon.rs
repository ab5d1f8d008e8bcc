//! Product vocabulary and lexicon confidence scoring

use support_agent_config::IntentConfig;

pub const CATEGORIES: &[&str] = &[
    "kolye", "bileklik", "yüzük", "küpe", "halhal", "set", "takı", "aksesuar", "zincir",
    "madalyon", "charm", "necklace", "bracelet", "ring", "earring", "anklet",
];

pub const ATTRIBUTES: &[&str] = &[
    "taşlı", "altın", "gümüş", "çelik", "inci", "pırlanta", "zirkon", "baget", "dorika", "steel",
    "pearl", "diamond",
];

pub const COLORS: &[&str] = &[
    "siyah", "beyaz", "mor", "fuşya", "pembe", "mavi", "yeşil", "kırmızı", "sarı", "turuncu",
    "gold", "silver", "rose", "black", "white", "red", "blue", "green", "pink",
];

/// Distinct lexicon hits and the capped score they produce
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexiconScore {
    pub score: u8,
    pub categories: Vec<&'static str>,
    pub attributes: Vec<&'static str>,
    pub colors: Vec<&'static str>,
}

impl LexiconScore {
    pub fn has_vocabulary(&self) -> bool {
        !self.categories.is_empty() || !self.attributes.is_empty() || !self.colors.is_empty()
    }

    /// Deterministic follow-up question based on which buckets fired
    pub fn clarification_question(&self) -> &'static str {
        let has_category = !self.categories.is_empty();
        let has_detail = !self.attributes.is_empty() || !self.colors.is_empty();
        match (has_category, has_detail) {
            (false, true) => {
                "Hangi ürün türüne bakıyorsunuz? Kolye, bileklik, yüzük veya küpe gibi bir kategori belirtebilir misiniz?"
            },
            (true, false) => {
                "Hangi malzeme veya özellikte olsun? Örneğin altın, gümüş, çelik ya da taşlı modellerimiz var."
            },
            _ => "Aradığınız ürünü biraz daha detaylandırabilir misiniz? Size en uygun seçenekleri bulmama yardımcı olur.",
        }
    }
}

/// Lowercase with Turkish dotted capital I folded to `i`
pub fn fold_case(text: &str) -> String {
    text.replace('İ', "i").to_lowercase()
}

/// Word-level tokens; Turkish suffixes stay attached
pub fn tokens(text: &str) -> Vec<String> {
    fold_case(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Noun inflections that may follow a vocabulary stem, in any sequence
const SUFFIXES: &[&str] = &[
    // plural
    "ler", "lar",
    // possessive
    "im", "ım", "um", "üm", "in", "ın", "un", "ün", "i", "ı", "u", "ü", "si", "sı", "su", "sü",
    "imiz", "ımız", "iniz", "ınız",
    // case
    "e", "a", "ye", "ya", "de", "da", "te", "ta", "den", "dan", "ten", "tan", "yi", "yı", "yu",
    "yü", "nin", "nın", "nun", "nün", "le", "la", "yle", "yla", "ki",
    // derivational
    "li", "lı", "lu", "lü", "siz", "sız", "suz", "süz", "lik", "lık", "luk", "lük", "ci", "cı",
    "çi", "çı",
];

/// Common words that parse as a stem plus suffixes but mean something else
const FALSE_FRIENDS: &[&str] = &["altında", "altına", "altından", "altındaki"];

fn is_suffix_chain(rest: &str) -> bool {
    rest.is_empty()
        || SUFFIXES
            .iter()
            .any(|suffix| rest.strip_prefix(suffix).is_some_and(is_suffix_chain))
}

/// Whether `token` is `term`, optionally inflected (`kolyeler`, `yüzüğü`)
fn matches_term(token: &str, term: &str) -> bool {
    if let Some(rest) = token.strip_prefix(term) {
        return is_suffix_chain(rest);
    }
    // Final k softens to ğ before a vowel
    term.strip_suffix('k')
        .and_then(|stem| token.strip_prefix(stem))
        .and_then(|rest| rest.strip_prefix('ğ'))
        .is_some_and(|rest| !rest.is_empty() && is_suffix_chain(rest))
}

/// Terms from `vocabulary` that some token inflects
fn hits(tokens: &[String], vocabulary: &'static [&'static str]) -> Vec<&'static str> {
    vocabulary
        .iter()
        .copied()
        .filter(|term| {
            tokens
                .iter()
                .filter(|t| !FALSE_FRIENDS.contains(&t.as_str()))
                .any(|t| matches_term(t, term))
        })
        .collect()
}

/// Score product intent from lexicon hits
///
/// Every distinct term adds its bucket weight. Color-only and attribute-only
/// matches are capped so a lone adjective cannot trigger a search.
pub fn score(text: &str, config: &IntentConfig) -> LexiconScore {
    let tokens = tokens(text);
    let categories = hits(&tokens, CATEGORIES);
    let attributes = hits(&tokens, ATTRIBUTES);
    let colors = hits(&tokens, COLORS);

    let raw = u32::from(config.category_weight) * categories.len() as u32
        + u32::from(config.attribute_weight) * attributes.len() as u32
        + u32::from(config.color_weight) * colors.len() as u32;

    let capped = match (categories.is_empty(), attributes.is_empty(), colors.is_empty()) {
        (true, true, false) => raw.min(u32::from(config.color_only_cap)),
        (true, false, true) => raw.min(u32::from(config.attribute_only_cap)),
        _ => raw,
    };

    LexiconScore {
        score: capped.min(100) as u8,
        categories,
        attributes,
        colors,
    }
}
