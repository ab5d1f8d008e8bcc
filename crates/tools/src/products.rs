//! Product search tool

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use support_agent_config::{AgentConfig, RerankerConfig};
use support_agent_core::{Corpus, Product, ToolDefinition};
use support_agent_llm::{truncate_text, ToolBuilder};
use support_agent_rag::{
    apply_exclusions, parse_exclude_terms, sanitize_query, CandidateReranker, HybridRetriever,
};

use crate::{string_arg, Tool, ToolError, ToolOutput};

pub const SEARCH_PRODUCTS: &str = "search_products";

const NO_PRODUCTS_FOUND: &str =
    "Aramanızla eşleşen ürün bulunamadı. Müşteriden farklı bir ürün türü, renk veya özellik belirtmesini isteyebilirsin.";

/// Variant names listed per product
const MAX_VARIANTS: usize = 5;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Pool sizes and formatting for product search
#[derive(Debug, Clone)]
pub struct SearchProductsConfig {
    /// Candidates retrieved before exclusions and reranking
    pub candidate_pool: usize,
    /// Products returned to the model
    pub final_limit: usize,
    pub description_chars: usize,
}

impl SearchProductsConfig {
    pub fn from_settings(reranker: &RerankerConfig, agent: &AgentConfig) -> Self {
        Self {
            candidate_pool: reranker.candidate_pool,
            final_limit: reranker.final_limit,
            description_chars: agent.product_description_chars,
        }
    }
}

impl Default for SearchProductsConfig {
    fn default() -> Self {
        Self::from_settings(&RerankerConfig::default(), &AgentConfig::default())
    }
}

/// Catalog search over the product corpus
pub struct SearchProductsTool {
    retriever: Arc<HybridRetriever>,
    reranker: Option<Arc<CandidateReranker>>,
    config: SearchProductsConfig,
}

impl SearchProductsTool {
    pub fn new(
        retriever: Arc<HybridRetriever>,
        reranker: Option<Arc<CandidateReranker>>,
        config: SearchProductsConfig,
    ) -> Self {
        Self {
            retriever,
            reranker,
            config,
        }
    }

    /// Retrieve, filter exclusions, rerank
    async fn find(&self, query: &str, exclude_terms: &[String]) -> Vec<Product> {
        let pool = self
            .retriever
            .search(Corpus::Product, query, self.config.candidate_pool)
            .await;
        let retrieved = pool.len();

        let filtered = apply_exclusions(pool, exclude_terms);
        if filtered.len() < retrieved {
            tracing::debug!(
                removed = retrieved - filtered.len(),
                exclude_terms = ?exclude_terms,
                "Excluded products"
            );
        }

        let ranked = match &self.reranker {
            Some(reranker) => reranker.rerank(query, filtered, self.config.final_limit).await,
            None => {
                let mut filtered = filtered;
                filtered.truncate(self.config.final_limit);
                filtered
            },
        };

        ranked
            .into_iter()
            .filter_map(|candidate| candidate.record.as_product().cloned())
            .collect()
    }
}

#[async_trait]
impl Tool for SearchProductsTool {
    fn name(&self) -> &str {
        SEARCH_PRODUCTS
    }

    fn definition(&self) -> ToolDefinition {
        ToolBuilder::new(
            SEARCH_PRODUCTS,
            "Mağaza kataloğunda ürün arar. Müşteri ürün, renk, malzeme veya kategori sorduğunda kullan. \
             Takip sorularında önceki konuşmadaki ürün kategorisini sorguya ekle.",
        )
        .param(
            "query",
            "string",
            "Aranacak ürün, örn: 'siyah taşlı kolye'",
            true,
        )
        .param(
            "exclude_terms",
            "string",
            "Sonuçlardan çıkarılacak özellikler, virgülle ayrılmış, örn: 'altın kaplama, gümüş'",
            false,
        )
        .build()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let raw_query = string_arg(&arguments, "query")
            .ok_or_else(|| ToolError::invalid_params("query is required"))?;
        let query = sanitize_query(raw_query);
        if query.is_empty() {
            return Err(ToolError::invalid_params("query is empty"));
        }

        let exclude_terms = match arguments.get("exclude_terms") {
            Some(Value::String(text)) => parse_exclude_terms(text),
            Some(Value::Array(items)) => parse_exclude_terms(
                &items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => Vec::new(),
        };

        let products = self.find(&query, &exclude_terms).await;
        tracing::info!(
            query = %query,
            exclude_terms = exclude_terms.len(),
            found = products.len(),
            "Product search"
        );

        if products.is_empty() {
            return Ok(ToolOutput::text(NO_PRODUCTS_FOUND));
        }

        let content = products
            .iter()
            .enumerate()
            .map(|(i, product)| format_product(product, i + 1, self.config.description_chars))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(ToolOutput::text(content).with_products(products))
    }
}

/// Render one product as a `[ÜRÜN_n]` block for the model
pub fn format_product(product: &Product, index: usize, description_chars: usize) -> String {
    let mut parts = vec![format!("[ÜRÜN_{}] **{}**", index, product.title)];

    let description = HTML_TAG.replace_all(&product.description, "");
    let description = description.trim();
    if !description.is_empty() {
        parts.push(format!("Açıklama: {}", truncate_text(description, description_chars)));
    }

    if let Some(price) = product.price_label() {
        parts.push(format!("Fiyat: {}", price));
    }

    if let Some(stock) = product.stock {
        let status = if stock > 0 {
            format!("Stokta ({} adet)", stock)
        } else {
            "Stokta Yok".to_string()
        };
        parts.push(format!("Stok: {}", status));
    }

    if product.variants.len() > 1 {
        let mut seen = HashSet::new();
        let options: Vec<&str> = product
            .variants
            .iter()
            .map(String::as_str)
            .filter(|v| seen.insert(*v))
            .take(MAX_VARIANTS)
            .collect();
        parts.push(format!("Seçenekler: {}", options.join(", ")));
    }

    if let Some(vendor) = product.vendor.as_deref().filter(|v| !v.is_empty()) {
        parts.push(format!("Marka: {}", vendor));
    }

    parts.join("\n   ")
}
