//! In-process corpus store
//!
//! Brute-force cosine search and substring matching over records held in
//! memory. Used for development, single-tenant deployments seeded from a
//! JSON file, and tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use support_agent_core::{
    Corpus, CorpusRecord, CorpusStore, DocumentChunk, Embedder, FaqEntry, Product, ScoredRecord,
};
use support_agent_text_processing::fold_case;

use crate::RagError;

/// Seed file layout
#[derive(Debug, Default, Deserialize)]
pub struct CorpusSeed {
    #[serde(default)]
    pub faqs: Vec<FaqEntry>,
    #[serde(default)]
    pub documents: Vec<DocumentChunk>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl CorpusSeed {
    pub fn into_records(self) -> Vec<CorpusRecord> {
        self.faqs
            .into_iter()
            .map(CorpusRecord::Faq)
            .chain(self.documents.into_iter().map(CorpusRecord::Document))
            .chain(self.products.into_iter().map(CorpusRecord::Product))
            .collect()
    }
}

struct Entry {
    record: CorpusRecord,
    embedding: Option<Vec<f32>>,
}

/// In-memory [`CorpusStore`]
#[derive(Default)]
pub struct InMemoryCorpusStore {
    corpora: RwLock<HashMap<Corpus, Vec<Entry>>>,
}

impl InMemoryCorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON seed file
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RagError::NotFound(format!("{}: {}", path.display(), e)))?;
        let seed: CorpusSeed = serde_json::from_str(&raw)
            .map_err(|e| RagError::VectorStore(format!("Invalid seed file {}: {}", path.display(), e)))?;

        let store = Self::new();
        let records = seed.into_records();
        tracing::info!(path = %path.display(), records = records.len(), "Loaded corpus seed");
        for record in records {
            store.insert(record, None);
        }
        Ok(store)
    }

    /// Insert or replace a record
    pub fn insert(&self, record: CorpusRecord, embedding: Option<Vec<f32>>) {
        let mut corpora = self.corpora.write();
        let entries = corpora.entry(record.corpus()).or_default();
        match entries.iter_mut().find(|e| e.record.id() == record.id()) {
            Some(existing) => {
                existing.record = record;
                existing.embedding = embedding;
            },
            None => entries.push(Entry { record, embedding }),
        }
    }

    pub fn len(&self, corpus: Corpus) -> usize {
        self.corpora.read().get(&corpus).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.corpora.read().values().all(Vec::is_empty)
    }

    /// Embed every record that has no vector yet
    ///
    /// Returns the number of records embedded. Records whose embedding fails
    /// stay keyword-searchable only.
    pub async fn index_embeddings(&self, embedder: &dyn Embedder) -> usize {
        let pending: Vec<(Corpus, String, String)> = self
            .corpora
            .read()
            .iter()
            .flat_map(|(corpus, entries)| {
                entries
                    .iter()
                    .filter(|e| e.embedding.is_none())
                    .map(|e| (*corpus, e.record.id().to_string(), e.record.searchable_text()))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut indexed = 0;
        for (corpus, id, text) in pending {
            match embedder.embed(&text).await {
                Ok(vector) => {
                    let mut corpora = self.corpora.write();
                    if let Some(entry) = corpora
                        .get_mut(&corpus)
                        .and_then(|entries| entries.iter_mut().find(|e| e.record.id() == id))
                    {
                        entry.embedding = Some(vector);
                        indexed += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, corpus = %corpus, id = %id, "Failed to embed record");
                },
            }
        }
        indexed
    }
}

#[async_trait]
impl CorpusStore for InMemoryCorpusStore {
    async fn nearest_neighbors(
        &self,
        corpus: Corpus,
        vector: &[f32],
        limit: usize,
    ) -> support_agent_core::Result<Vec<ScoredRecord>> {
        let corpora = self.corpora.read();
        let mut hits: Vec<ScoredRecord> = corpora
            .get(&corpus)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let embedding = entry.embedding.as_ref()?;
                        Some(ScoredRecord {
                            record: entry.record.clone(),
                            distance: 1.0 - cosine_similarity(vector, embedding),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn keyword_search(
        &self,
        corpus: Corpus,
        terms: &[String],
        limit: usize,
    ) -> support_agent_core::Result<Vec<CorpusRecord>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let corpora = self.corpora.read();
        Ok(corpora
            .get(&corpus)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| {
                        let text = fold_case(&entry.record.searchable_text());
                        terms.iter().any(|term| text.contains(&fold_case(term)))
                    })
                    .take(limit)
                    .map(|entry| entry.record.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn faq(id: &str, question: &str) -> CorpusRecord {
        CorpusRecord::Faq(FaqEntry {
            id: id.into(),
            question: question.into(),
            answer: "cevap".into(),
        })
    }

    #[tokio::test]
    async fn test_nearest_neighbors_ordering() {
        let store = InMemoryCorpusStore::new();
        store.insert(faq("a", "kargo"), Some(vec![1.0, 0.0]));
        store.insert(faq("b", "iade"), Some(vec![0.0, 1.0]));
        store.insert(faq("c", "değişim"), None);

        let hits = store.nearest_neighbors(Corpus::Faq, &[0.9, 0.1], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id(), "a");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_keyword_search_is_case_insensitive() {
        let store = InMemoryCorpusStore::new();
        store.insert(faq("a", "Kargo ücreti nedir?"), None);
        store.insert(faq("b", "İade süresi"), None);

        let hits = store
            .keyword_search(Corpus::Faq, &["kargo".to_string()], 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "a");
        assert!(store
            .keyword_search(Corpus::Product, &["kargo".to_string()], 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_insert_replaces_by_id() {
        let store = InMemoryCorpusStore::new();
        store.insert(faq("a", "eski"), None);
        store.insert(faq("a", "yeni"), None);
        assert_eq!(store.len(Corpus::Faq), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"faqs":[{{"id":"f1","question":"Kargo?","answer":"2 gün"}}],
                "products":[{{"id":"p1","title":"Siyah Kolye","min_price":100.0}}]}}"#
        )
        .unwrap();

        let store = InMemoryCorpusStore::from_seed_file(file.path()).unwrap();
        assert_eq!(store.len(Corpus::Faq), 1);
        assert_eq!(store.len(Corpus::Product), 1);
        assert_eq!(store.len(Corpus::Document), 0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
