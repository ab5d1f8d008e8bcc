//! LLM candidate reranker
//!
//! Narrows an oversized candidate pool to a short list by asking the model
//! which candidates best satisfy the query's explicit constraints. Any
//! failure falls back to the pre-rerank order.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use support_agent_config::RerankerConfig;
use support_agent_core::{CorpusRecord, GenerateRequest, LanguageModel, RetrievalCandidate};
use support_agent_llm::{parse_json_response, truncate_text};
use support_agent_text_processing::fold_case;

const RERANK_SYSTEM_PROMPT: &str = "You rank e-commerce search results. \
Given a customer query and numbered candidates, pick the candidates that best match the \
query's explicit constraints (category, material, color, exclusions) and order them best first. \
Respond with JSON only: {\"ids\": [\"<id>\", ...]}. Use only ids from the list.";

/// Why a rerank fell back to the original order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    LlmError,
    Unparsable,
    EmptySelection,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::LlmError => "llm_error",
            FallbackReason::Unparsable => "unparsable",
            FallbackReason::EmptySelection => "empty_selection",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Selection {
    #[serde(alias = "product_ids", alias = "selected_ids")]
    ids: Vec<serde_json::Value>,
}

/// Reorders candidates with a single structured LLM call
pub struct CandidateReranker {
    llm: Arc<dyn LanguageModel>,
    config: RerankerConfig,
}

impl CandidateReranker {
    pub fn new(llm: Arc<dyn LanguageModel>, config: RerankerConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    /// Rerank down to `final_limit` candidates
    ///
    /// Pools that already fit are returned untouched and cost no LLM call.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalCandidate>,
        final_limit: usize,
    ) -> Vec<RetrievalCandidate> {
        if candidates.len() <= final_limit {
            return candidates;
        }
        if !self.config.enabled {
            return truncated(candidates, final_limit);
        }

        match self.select(query, &candidates, final_limit).await {
            Ok(ids) => {
                tracing::debug!(selected = ids.len(), pool = candidates.len(), "Reranked candidates");
                reorder(candidates, &ids)
            },
            Err(reason) => {
                metrics::counter!(
                    "support_agent_reranker_fallback_total",
                    "reason" => reason.as_str()
                )
                .increment(1);
                truncated(candidates, final_limit)
            },
        }
    }

    /// Ask the model for ids and validate them against the pool
    async fn select(
        &self,
        query: &str,
        candidates: &[RetrievalCandidate],
        final_limit: usize,
    ) -> Result<Vec<String>, FallbackReason> {
        let mut request = GenerateRequest::new(RERANK_SYSTEM_PROMPT)
            .with_user_message(self.build_prompt(query, candidates, final_limit))
            .with_temperature(0.0)
            .with_max_tokens(self.config.max_tokens)
            .with_json_mode();
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }

        let response = self.llm.generate(request).await.map_err(|e| {
            tracing::warn!(error = %e, "Reranker LLM call failed, keeping retrieval order");
            FallbackReason::LlmError
        })?;

        let selection: Selection = parse_json_response(&response.text).map_err(|e| {
            tracing::warn!(error = %e, "Unparsable reranker response, keeping retrieval order");
            FallbackReason::Unparsable
        })?;

        let ids = validate_ids(&selection.ids, candidates, final_limit);
        if ids.is_empty() {
            tracing::warn!(
                returned = selection.ids.len(),
                "Reranker selected no known candidates, keeping retrieval order"
            );
            return Err(FallbackReason::EmptySelection);
        }
        Ok(fill_from_retrieval(ids, candidates, final_limit))
    }

    fn build_prompt(&self, query: &str, candidates: &[RetrievalCandidate], final_limit: usize) -> String {
        let mut prompt = format!(
            "Query: {}\n\nSelect the best {} candidates.\n\nCandidates:\n",
            query.trim(),
            final_limit
        );
        for candidate in candidates {
            prompt.push_str(&self.describe(&candidate.record));
            prompt.push('\n');
        }
        prompt
    }

    /// One compact line per candidate
    fn describe(&self, record: &CorpusRecord) -> String {
        let limit = self.config.description_chars;
        match record {
            CorpusRecord::Product(p) => {
                let mut line = format!("- id={} | {}", p.id, p.title);
                let facets: Vec<&str> = [p.vendor.as_deref(), p.product_type.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                if !facets.is_empty() {
                    line.push_str(&format!(" | {}", facets.join(" / ")));
                }
                if let Some(price) = p.price_label() {
                    line.push_str(&format!(" | {}", price));
                }
                if !p.description.is_empty() {
                    line.push_str(&format!(" | {}", truncate_text(&p.description, limit)));
                }
                line
            },
            CorpusRecord::Faq(faq) => format!(
                "- id={} | {} | {}",
                faq.id,
                faq.question,
                truncate_text(&faq.answer, limit)
            ),
            CorpusRecord::Document(chunk) => {
                format!("- id={} | {}", chunk.id, truncate_text(&chunk.content, limit))
            },
        }
    }
}

fn truncated(mut candidates: Vec<RetrievalCandidate>, limit: usize) -> Vec<RetrievalCandidate> {
    candidates.truncate(limit);
    candidates
}

/// Keep returned ids that exist in the pool, first occurrence only
fn validate_ids(
    returned: &[serde_json::Value],
    candidates: &[RetrievalCandidate],
    final_limit: usize,
) -> Vec<String> {
    let known: HashSet<&str> = candidates.iter().map(|c| c.id()).collect();
    let mut seen = HashSet::new();

    returned
        .iter()
        .filter_map(|value| match value {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|id| known.contains(id.as_str()))
        .filter(|id| seen.insert(id.clone()))
        .take(final_limit)
        .collect()
}

/// Top up a short selection with unselected candidates in retrieval order
fn fill_from_retrieval(
    mut ids: Vec<String>,
    candidates: &[RetrievalCandidate],
    final_limit: usize,
) -> Vec<String> {
    for candidate in candidates {
        if ids.len() >= final_limit {
            break;
        }
        if !ids.iter().any(|id| id == candidate.id()) {
            ids.push(candidate.id().to_string());
        }
    }
    ids
}

fn reorder(candidates: Vec<RetrievalCandidate>, ids: &[String]) -> Vec<RetrievalCandidate> {
    let mut pool: Vec<Option<RetrievalCandidate>> = candidates.into_iter().map(Some).collect();
    ids.iter()
        .filter_map(|id| {
            pool.iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|c| c.id() == id))
                .and_then(Option::take)
        })
        .collect()
}

/// Split free-text exclusions ("altın kaplama, gümüş ve taşlı") into terms
pub fn parse_exclude_terms(text: &str) -> Vec<String> {
    let lowered = fold_case(text);
    let mut normalized = lowered.replace([',', ';', '/', '|'], ",");
    for separator in [" ve ", " veya ", " and ", " or "] {
        normalized = normalized.replace(separator, ",");
    }

    let mut seen = HashSet::new();
    normalized
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .filter(|term| seen.insert(term.to_string()))
        .map(str::to_string)
        .collect()
}

/// Drop candidates whose title or description mentions an excluded term
pub fn apply_exclusions(
    candidates: Vec<RetrievalCandidate>,
    exclude_terms: &[String],
) -> Vec<RetrievalCandidate> {
    if exclude_terms.is_empty() {
        return candidates;
    }

    candidates
        .into_iter()
        .filter(|candidate| {
            let text = match &candidate.record {
                CorpusRecord::Product(p) => format!("{} {}", p.title, p.description),
                other => other.searchable_text(),
            };
            let text = fold_case(&text);
            !exclude_terms.iter().any(|term| text.contains(term.as_str()))
        })
        .collect()
}
