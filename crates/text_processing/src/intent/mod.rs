//! Multi-intent classification of a pending message batch
//!
//! Tiers, cheapest first:
//! 1. Fast path: a single small-talk message with no product vocabulary.
//! 2. Lexicon scoring: weighted category/attribute/color hits decide between
//!    a direct product search and a clarifying question.
//! 3. LLM: structured classification with recent conversation turns, used
//!    when lexicon signals are weak or absent.
//! 4. Regex fallback when the LLM is unavailable or returns garbage.
//!
//! Classification never fails.

pub mod lexicon;
pub mod patterns;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use support_agent_config::IntentConfig;
use support_agent_core::{GenerateRequest, IntentLabel, IntentResult, LanguageModel};
use support_agent_llm::parse_json_response;

pub use lexicon::LexiconScore;
pub use patterns::is_handoff_request;

/// Words dropped from extracted product keywords
const KEYWORD_STOPWORDS: &[&str] = &[
    "var", "mı", "mi", "mu", "mü", "ne", "kaç", "tl", "lira", "nasıl", "nedir", "bir", "ve",
    "ile", "de", "da", "için", "the", "and", "for", "with", "have", "you",
];

static LETTER_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").unwrap());

/// Tier that produced a classification, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierTier {
    FastPath,
    Lexicon,
    Llm,
    Regex,
}

impl ClassifierTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierTier::FastPath => "fast_path",
            ClassifierTier::Lexicon => "lexicon",
            ClassifierTier::Llm => "llm",
            ClassifierTier::Regex => "regex",
        }
    }
}

#[derive(Debug, Deserialize)]
struct LlmClassification {
    #[serde(default)]
    intents: Vec<String>,
    #[serde(default)]
    product_keywords: Vec<String>,
    #[serde(default)]
    summary: Option<String>,
}

pub struct IntentClassifier {
    config: IntentConfig,
    llm: Option<Arc<dyn LanguageModel>>,
}

impl IntentClassifier {
    pub fn new(config: IntentConfig, llm: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { config, llm }
    }

    /// Classifier without an LLM tier
    pub fn lexicon_only(config: IntentConfig) -> Self {
        Self::new(config, None)
    }

    /// Classify a pending batch, with earlier turns as optional context
    pub async fn classify(&self, messages: &[String], context: &[String]) -> IntentResult {
        let messages: Vec<&str> = messages
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();
        if messages.is_empty() {
            return IntentResult::new([], "");
        }
        let combined = messages.join("\n");
        let lexicon = lexicon::score(&combined, &self.config);

        let (tier, result) = self.run_tiers(&messages, &combined, &lexicon, context).await;
        metrics::counter!("support_agent_intent_tier_total", "tier" => tier.as_str()).increment(1);
        tracing::debug!(
            tier = tier.as_str(),
            intents = ?result.intents,
            confidence = result.confidence,
            keywords = ?result.product_keywords,
            "Classified pending batch"
        );
        result
    }

    async fn run_tiers(
        &self,
        messages: &[&str],
        combined: &str,
        lexicon: &LexiconScore,
        context: &[String],
    ) -> (ClassifierTier, IntentResult) {
        if messages.len() == 1 && !lexicon.has_vocabulary() {
            let labels = patterns::simple_intents(messages[0]);
            if !labels.is_empty() {
                return (ClassifierTier::FastPath, IntentResult::new(labels, combined));
            }
        }

        if lexicon.score >= self.config.clarify_threshold {
            return (ClassifierTier::Lexicon, self.lexicon_result(combined, lexicon));
        }

        if let Some(llm) = &self.llm {
            match self.classify_with_llm(llm.as_ref(), combined, context).await {
                Ok(parsed) => {
                    let result = self.llm_result(parsed, combined, lexicon, !context.is_empty());
                    return (ClassifierTier::Llm, result);
                },
                Err(e) => {
                    tracing::warn!(error = %e, "LLM intent classification failed, using pattern fallback");
                },
            }
        }

        (ClassifierTier::Regex, self.fallback_result(combined, lexicon))
    }

    fn lexicon_result(&self, combined: &str, lexicon: &LexiconScore) -> IntentResult {
        let mut intents: BTreeSet<IntentLabel> = patterns::secondary_intents(combined).into_iter().collect();
        let keywords = self.extract_keywords(combined);

        let result = if lexicon.score >= self.config.direct_threshold {
            intents.insert(IntentLabel::ProductQuery);
            IntentResult::new(intents, combined)
        } else {
            intents.insert(IntentLabel::ClarificationNeeded);
            IntentResult::new(intents, combined).with_clarification(lexicon.clarification_question())
        };

        result.with_confidence(lexicon.score).with_keywords(keywords)
    }

    async fn classify_with_llm(
        &self,
        llm: &dyn LanguageModel,
        combined: &str,
        context: &[String],
    ) -> Result<LlmClassification, String> {
        let mut request = GenerateRequest::new(CLASSIFIER_SYSTEM_PROMPT)
            .with_user_message(self.build_prompt(combined, context))
            .with_temperature(self.config.llm_temperature)
            .with_max_tokens(self.config.llm_max_tokens)
            .with_json_mode();
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }

        let response = llm.generate(request).await.map_err(|e| e.to_string())?;
        parse_json_response(&response.text)
    }

    fn build_prompt(&self, combined: &str, context: &[String]) -> String {
        let mut prompt = String::new();

        let recent: Vec<&String> = context
            .iter()
            .rev()
            .take(self.config.context_turns)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if !recent.is_empty() {
            prompt.push_str("Önceki konuşma:\n");
            for turn in recent {
                prompt.push_str(turn);
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        prompt.push_str("Müşteri mesaj(lar)ı:\n");
        prompt.push_str(combined);
        prompt
    }

    fn llm_result(
        &self,
        parsed: LlmClassification,
        combined: &str,
        lexicon: &LexiconScore,
        uses_context: bool,
    ) -> IntentResult {
        let mut intents: BTreeSet<IntentLabel> = parsed
            .intents
            .iter()
            .filter_map(|label| match label.parse::<IntentLabel>() {
                Ok(label) => Some(label),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unknown intent label from LLM");
                    None
                },
            })
            .collect();
        if intents.is_empty() {
            intents.insert(IntentLabel::Other);
        }

        let mut keywords = self.clean_keywords(parsed.product_keywords.iter().map(String::as_str));
        if intents.contains(&IntentLabel::ProductQuery) && keywords.is_empty() {
            keywords = self.extract_keywords(combined);
        }

        if let Some(summary) = parsed.summary.as_deref() {
            tracing::debug!(summary, "LLM intent summary");
        }

        let result = if intents.contains(&IntentLabel::ClarificationNeeded) {
            IntentResult::new(intents, combined).with_clarification(lexicon.clarification_question())
        } else {
            IntentResult::new(intents, combined)
        };

        result
            .with_confidence(lexicon.score)
            .with_keywords(keywords)
            .with_context(uses_context)
    }

    /// Pattern-only classification, always produces at least one label
    fn fallback_result(&self, combined: &str, lexicon: &LexiconScore) -> IntentResult {
        let mut intents: BTreeSet<IntentLabel> = patterns::secondary_intents(combined).into_iter().collect();
        let mut keywords = Vec::new();

        if lexicon.has_vocabulary() || patterns::mentions_general_product(combined) {
            intents.insert(IntentLabel::ProductQuery);
            keywords = self.extract_keywords(combined);
        }

        if intents.is_empty() && combined.contains('?') {
            intents.insert(IntentLabel::GeneralQuestion);
        }
        if intents.is_empty() {
            intents.insert(IntentLabel::Other);
        }

        IntentResult::new(intents, combined)
            .with_confidence(lexicon.score)
            .with_keywords(keywords)
    }

    /// Product keywords from free text
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        let folded = lexicon::fold_case(text);
        let words = LETTER_RUNS.find_iter(&folded).map(|m| m.as_str()).collect::<Vec<_>>();
        self.clean_keywords(words.into_iter())
    }

    fn clean_keywords<'a>(&self, words: impl Iterator<Item = &'a str>) -> Vec<String> {
        let mut seen = HashSet::new();
        words
            .map(|w| lexicon::fold_case(w.trim()))
            .filter(|w| w.chars().count() > 2)
            .filter(|w| !KEYWORD_STOPWORDS.contains(&w.as_str()))
            .filter(|w| seen.insert(w.clone()))
            .take(self.config.max_keywords)
            .collect()
    }
}

const CLASSIFIER_SYSTEM_PROMPT: &str = "Müşteri mesajlarını analiz edip intent'leri tespit ediyorsun.

Intent türleri:
- greeting: Selamlama (merhaba, selam, günaydın)
- farewell: Vedalaşma (görüşürüz, hoşçakal)
- thanks: Teşekkür (teşekkürler, sağol)
- product_query: Ürün sorgusu (ürün arama, fiyat, stok, ürün özellikleri)
- order_query: Sipariş sorgusu (sipariş durumu, kargo takibi)
- general_question: Genel soru (SSS, bilgi talebi)
- complaint: Şikayet (problem bildirimi)
- human_request: İnsan talebi (müşteri temsilcisi isteme)
- confirmation: Onay/Red (evet, hayır, tamam)
- clarification_needed: Ürün isteği var ama ne arandığı belirsiz
- other: Diğer

SADECE şu JSON formatında yanıt ver:
{\"intents\": [\"intent1\"], \"product_keywords\": [\"kelime\"], \"summary\": \"kısa özet\"}

Kurallar:
- Birden fazla intent olabilir (örn: selamlama + ürün sorgusu)
- Önceki konuşma verilmişse, \"kırmızı olanı\" gibi atıfları oradaki ürünle çöz ve product_keywords'e yaz
- Sadece selamlama/teşekkür/veda ise product_keywords boş olmalı";
