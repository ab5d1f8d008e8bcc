//! Hybrid retriever
//!
//! Runs a semantic and a keyword channel per corpus in parallel and merges
//! them. FAQ and document corpora use weighted Reciprocal Rank Fusion; the
//! product corpus uses a keyword-match waterfall so an exact attribute match
//! outranks a closer but merely similar item.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use support_agent_config::RetrievalConfig;
use support_agent_core::{
    Corpus, CorpusRecord, CorpusStore, Embedder, MatchSource, RetrievalCandidate, ScoredRecord,
};

use crate::keywords::{count_term_matches, normalize_product_query, normalize_query};
use crate::RagError;

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// RRF constant (k)
    pub rrf_k: f32,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    /// Semantic hits below this similarity never reach fusion
    pub min_similarity: f32,
    /// Normalized terms kept for the keyword channel
    pub max_keywords: usize,
    /// Per-channel fetch size is `limit * candidate_multiplier`
    pub candidate_multiplier: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for RetrieverConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            rrf_k: config.rrf_k,
            semantic_weight: config.semantic_weight,
            keyword_weight: config.keyword_weight,
            min_similarity: config.min_similarity,
            max_keywords: config.max_keywords,
            candidate_multiplier: config.candidate_multiplier.max(1),
        }
    }
}

/// Channel that failed during a search, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Semantic,
    Keyword,
}

impl Channel {
    fn as_str(&self) -> &'static str {
        match self {
            Channel::Semantic => "semantic",
            Channel::Keyword => "keyword",
        }
    }
}

/// Hybrid retriever over the injected embedder and corpus store
pub struct HybridRetriever {
    config: RetrieverConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn CorpusStore>,
}

impl HybridRetriever {
    pub fn new(
        config: RetrieverConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn CorpusStore>,
    ) -> Self {
        Self {
            config,
            embedder,
            store,
        }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Search one corpus, best candidates first
    ///
    /// Never fails: a channel that errors is dropped and counted, and when
    /// both fail the result is empty.
    pub async fn search(&self, corpus: Corpus, query: &str, limit: usize) -> Vec<RetrievalCandidate> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let terms = match corpus {
            Corpus::Product => normalize_product_query(query, self.config.max_keywords),
            Corpus::Faq | Corpus::Document => normalize_query(query, self.config.max_keywords),
        };
        let fetch = limit.saturating_mul(self.config.candidate_multiplier);

        let (semantic, keyword) = tokio::join!(
            self.search_semantic(corpus, query, fetch),
            self.search_keyword(corpus, &terms, fetch),
        );

        let semantic = self.channel_or_empty(Channel::Semantic, corpus, semantic);
        let keyword = self.channel_or_empty(Channel::Keyword, corpus, keyword);
        let (semantic, keyword) = match (semantic, keyword) {
            (None, None) => {
                tracing::warn!(corpus = %corpus, "Both retrieval channels failed, returning no candidates");
                return Vec::new();
            },
            (s, k) => (s.unwrap_or_default(), k.unwrap_or_default()),
        };

        tracing::debug!(
            corpus = %corpus,
            semantic = semantic.len(),
            keyword = keyword.len(),
            terms = terms.len(),
            "Retrieval channels complete"
        );

        let mut results = match corpus {
            Corpus::Product => waterfall_merge(&semantic, &keyword, &terms),
            Corpus::Faq | Corpus::Document => self.rrf_fusion(&semantic, &keyword),
        };
        results.truncate(limit);
        results
    }

    /// Embed, nearest-neighbour search, then apply the similarity floor
    async fn search_semantic(
        &self,
        corpus: Corpus,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, RagError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let hits = self
            .store
            .nearest_neighbors(corpus, &vector, limit)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(hits
            .into_iter()
            .filter(|hit| hit.similarity() >= self.config.min_similarity)
            .collect())
    }

    async fn search_keyword(
        &self,
        corpus: Corpus,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<CorpusRecord>, RagError> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .keyword_search(corpus, terms, limit)
            .await
            .map_err(|e| RagError::Search(e.to_string()))
    }

    fn channel_or_empty<T>(
        &self,
        channel: Channel,
        corpus: Corpus,
        result: Result<Vec<T>, RagError>,
    ) -> Option<Vec<T>> {
        match result {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    channel = channel.as_str(),
                    corpus = %corpus,
                    "Retrieval channel failed, continuing with the other channel"
                );
                metrics::counter!(
                    "support_agent_retrieval_channel_failures_total",
                    "channel" => channel.as_str()
                )
                .increment(1);
                None
            },
        }
    }

    /// Weighted Reciprocal Rank Fusion
    ///
    /// `score = weight * 1 / (k + rank + 1)`, summed per record across
    /// channels. Ties keep first-seen order.
    pub fn rrf_fusion(
        &self,
        semantic: &[ScoredRecord],
        keyword: &[CorpusRecord],
    ) -> Vec<RetrievalCandidate> {
        let mut fused: Vec<RetrievalCandidate> = Vec::with_capacity(semantic.len() + keyword.len());
        let mut index: HashMap<String, usize> = HashMap::new();

        for (rank, hit) in semantic.iter().enumerate() {
            let weighted = self.config.semantic_weight / (self.config.rrf_k + rank as f32 + 1.0);
            match index.get(hit.record.id()) {
                Some(&i) => fused[i].match_score += weighted,
                None => {
                    index.insert(hit.record.id().to_string(), fused.len());
                    fused.push(RetrievalCandidate {
                        record: hit.record.clone(),
                        match_score: weighted,
                        source: MatchSource::Semantic,
                        similarity: Some(hit.similarity()),
                    });
                },
            }
        }

        for (rank, record) in keyword.iter().enumerate() {
            let weighted = self.config.keyword_weight / (self.config.rrf_k + rank as f32 + 1.0);
            match index.get(record.id()) {
                Some(&i) => {
                    let candidate = &mut fused[i];
                    candidate.match_score += weighted;
                    if candidate.source == MatchSource::Semantic {
                        candidate.source = MatchSource::Hybrid;
                    }
                },
                None => {
                    index.insert(record.id().to_string(), fused.len());
                    fused.push(RetrievalCandidate {
                        record: record.clone(),
                        match_score: weighted,
                        source: MatchSource::Keyword,
                        similarity: None,
                    });
                },
            }
        }

        fused.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
        fused
    }
}

/// Match tiers of the product waterfall, highest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Full,
    Partial,
    Single,
    SemanticOnly,
}

/// Keyword-match waterfall for the product corpus
///
/// Candidates are bucketed by how many distinct query terms their text
/// contains: all terms, at least two, exactly one, none (semantic hit only).
/// Tiers are emitted in that order. Within a tier, discovery order is kept
/// (semantic hits first, then keyword-only hits), except the partial tier
/// which is ordered by match count.
pub fn waterfall_merge(
    semantic: &[ScoredRecord],
    keyword: &[CorpusRecord],
    terms: &[String],
) -> Vec<RetrievalCandidate> {
    let keyword_ids: HashSet<&str> = keyword.iter().map(|r| r.id()).collect();

    let mut discovered: Vec<RetrievalCandidate> = Vec::with_capacity(semantic.len() + keyword.len());
    let mut seen: HashSet<String> = HashSet::new();

    for hit in semantic {
        if !seen.insert(hit.record.id().to_string()) {
            continue;
        }
        let source = if keyword_ids.contains(hit.record.id()) {
            MatchSource::Hybrid
        } else {
            MatchSource::Semantic
        };
        discovered.push(RetrievalCandidate {
            match_score: count_term_matches(&hit.record.searchable_text(), terms) as f32,
            record: hit.record.clone(),
            source,
            similarity: Some(hit.similarity()),
        });
    }

    for record in keyword {
        if !seen.insert(record.id().to_string()) {
            continue;
        }
        // The store matched it on at least one term even if its tokenizer
        // disagrees with plain substring counting.
        let hits = count_term_matches(&record.searchable_text(), terms).max(1);
        discovered.push(RetrievalCandidate {
            record: record.clone(),
            match_score: hits as f32,
            source: MatchSource::Keyword,
            similarity: None,
        });
    }

    let tier_of = |candidate: &RetrievalCandidate| -> Tier {
        let hits = candidate.match_score as usize;
        if terms.is_empty() || hits == 0 {
            Tier::SemanticOnly
        } else if hits >= terms.len() {
            Tier::Full
        } else if hits >= 2 {
            Tier::Partial
        } else {
            Tier::Single
        }
    };

    let mut tiered: Vec<(Tier, RetrievalCandidate)> =
        discovered.into_iter().map(|c| (tier_of(&c), c)).collect();

    // Stable: discovery order survives inside each tier
    tiered.sort_by(|(tier_a, a), (tier_b, b)| {
        tier_a.cmp(tier_b).then_with(|| {
            if *tier_a == Tier::Partial {
                b.match_score.total_cmp(&a.match_score)
            } else {
                std::cmp::Ordering::Equal
            }
        })
    });

    tiered.into_iter().map(|(_, c)| c).collect()
}
