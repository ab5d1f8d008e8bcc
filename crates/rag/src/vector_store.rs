//! Corpus store backed by Qdrant
//!
//! One collection per corpus (`{prefix}_faq`, `{prefix}_document`,
//! `{prefix}_product`). Each point carries the serialized record under
//! `record` and its lowercased searchable text under `text`, which has a
//! full-text index for the keyword channel.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        condition::ConditionOneOf, point_id::PointIdOptions, r#match::MatchValue, value::Kind,
        Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance,
        FieldCondition, FieldType, Filter, Match, PointStruct, ScrollPointsBuilder,
        SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
    },
    Qdrant,
};
use support_agent_config::{constants::endpoints, VectorStoreConfig};
use support_agent_core::{Corpus, CorpusRecord, CorpusStore, ScoredRecord};
use support_agent_text_processing::fold_case;

use crate::RagError;

const RECORD_FIELD: &str = "record";
const TEXT_FIELD: &str = "text";

/// Qdrant connection settings
#[derive(Debug, Clone)]
pub struct QdrantStoreConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub collection_prefix: String,
    pub vector_dim: usize,
}

impl QdrantStoreConfig {
    pub fn from_settings(config: &VectorStoreConfig, vector_dim: usize) -> Self {
        Self {
            endpoint: config
                .qdrant_url
                .clone()
                .unwrap_or_else(|| endpoints::QDRANT_DEFAULT.to_string()),
            api_key: config.api_key.clone(),
            collection_prefix: config.collection_prefix.clone(),
            vector_dim,
        }
    }

    pub fn collection(&self, corpus: Corpus) -> String {
        format!("{}_{}", self.collection_prefix, corpus.as_str())
    }
}

/// Qdrant-backed [`CorpusStore`]
pub struct QdrantCorpusStore {
    client: Qdrant,
    config: QdrantStoreConfig,
}

impl QdrantCorpusStore {
    pub fn new(config: QdrantStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create missing collections and their text indexes
    pub async fn ensure_collections(&self) -> Result<(), RagError> {
        for corpus in [Corpus::Faq, Corpus::Document, Corpus::Product] {
            let name = self.config.collection(corpus);
            let exists = self
                .client
                .collection_exists(&name)
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;
            if exists {
                continue;
            }

            self.client
                .create_collection(CreateCollectionBuilder::new(&name).vectors_config(
                    VectorParamsBuilder::new(self.config.vector_dim as u64, Distance::Cosine),
                ))
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;

            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &name,
                    TEXT_FIELD,
                    FieldType::Text,
                ))
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;

            tracing::info!(collection = %name, "Created corpus collection");
        }
        Ok(())
    }

    /// Insert or replace records with their embeddings
    pub async fn upsert(
        &self,
        records: &[CorpusRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if records.len() != embeddings.len() {
            return Err(RagError::VectorStore(
                "Record and embedding count mismatch".to_string(),
            ));
        }

        let mut by_corpus: HashMap<Corpus, Vec<PointStruct>> = HashMap::new();
        for (record, embedding) in records.iter().zip(embeddings) {
            let serialized = serde_json::to_string(record)
                .map_err(|e| RagError::VectorStore(format!("Failed to serialize record: {}", e)))?;

            let mut payload: HashMap<String, Value> = HashMap::new();
            payload.insert(RECORD_FIELD.to_string(), serialized.into());
            payload.insert(
                TEXT_FIELD.to_string(),
                fold_case(&record.searchable_text()).into(),
            );

            by_corpus.entry(record.corpus()).or_default().push(PointStruct::new(
                point_id(record.id()),
                embedding.clone(),
                payload,
            ));
        }

        for (corpus, points) in by_corpus {
            self.client
                .upsert_points(UpsertPointsBuilder::new(self.config.collection(corpus), points))
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for QdrantCorpusStore {
    async fn nearest_neighbors(
        &self,
        corpus: Corpus,
        vector: &[f32],
        limit: usize,
    ) -> support_agent_core::Result<Vec<ScoredRecord>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.config.collection(corpus), vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id.as_ref().map(describe_point_id).unwrap_or_default();
                let record = decode_record(&point.payload, &id)?;
                Some(ScoredRecord {
                    record,
                    // cosine score is similarity
                    distance: 1.0 - point.score,
                })
            })
            .collect())
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

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(self.config.collection(corpus))
                    .filter(text_filter(terms))
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id.as_ref().map(describe_point_id).unwrap_or_default();
                decode_record(&point.payload, &id)
            })
            .collect())
    }
}

/// Any-term full-text filter on the `text` payload
fn text_filter(terms: &[String]) -> Filter {
    let should = terms
        .iter()
        .map(|term| Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: TEXT_FIELD.to_string(),
                r#match: Some(Match {
                    match_value: Some(MatchValue::Text(term.clone())),
                }),
                ..Default::default()
            })),
        })
        .collect();

    Filter {
        should,
        ..Default::default()
    }
}

/// Stable numeric point id derived from the record id
fn point_id(record_id: &str) -> u64 {
    let hash = blake3::hash(record_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn describe_point_id(id: &qdrant_client::qdrant::PointId) -> String {
    match &id.point_id_options {
        Some(PointIdOptions::Uuid(u)) => u.clone(),
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn decode_record(payload: &HashMap<String, Value>, point: &str) -> Option<CorpusRecord> {
    let raw = match payload.get(RECORD_FIELD).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s,
        _ => {
            tracing::warn!(point = %point, "Qdrant point without record payload");
            return None;
        },
    };

    match serde_json::from_str(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(error = %e, point = %point, "Failed to decode corpus record");
            None
        },
    }
}
