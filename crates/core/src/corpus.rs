//! Corpus records and retrieval candidates
//!
//! Records are owned by the external catalog/knowledge stores. The retrieval
//! layer only holds them for the duration of one search together with the
//! score that got them there.

use serde::{Deserialize, Serialize};

/// Searchable corpora
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corpus {
    Faq,
    Document,
    Product,
}

impl Corpus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Corpus::Faq => "faq",
            Corpus::Document => "document",
            Corpus::Product => "product",
        }
    }
}

impl std::fmt::Display for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approved question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// Chunk of an uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    #[serde(default)]
    pub document_name: Option<String>,
    pub content: String,
}

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Brand
    #[serde(default)]
    pub vendor: Option<String>,
    /// Category
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    /// Total inventory, `None` when the catalog does not track stock
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Product {
    /// Fields the keyword channel matches against
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {}", self.title, self.description);
        for field in [&self.vendor, &self.product_type].into_iter().flatten() {
            text.push(' ');
            text.push_str(field);
        }
        text
    }

    /// Human-readable price, e.g. `149.90 TL` or `100.00 - 250.00 TL`
    pub fn price_label(&self) -> Option<String> {
        match (self.min_price, self.max_price) {
            (Some(min), Some(max)) if (max - min).abs() > f64::EPSILON => {
                Some(format!("{:.2} - {:.2} TL", min, max))
            },
            (Some(price), _) | (None, Some(price)) => Some(format!("{:.2} TL", price)),
            (None, None) => None,
        }
    }
}

/// Any record from one of the three corpora
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "corpus", rename_all = "snake_case")]
pub enum CorpusRecord {
    Faq(FaqEntry),
    Document(DocumentChunk),
    Product(Product),
}

impl CorpusRecord {
    pub fn id(&self) -> &str {
        match self {
            CorpusRecord::Faq(faq) => &faq.id,
            CorpusRecord::Document(chunk) => &chunk.id,
            CorpusRecord::Product(product) => &product.id,
        }
    }

    pub fn corpus(&self) -> Corpus {
        match self {
            CorpusRecord::Faq(_) => Corpus::Faq,
            CorpusRecord::Document(_) => Corpus::Document,
            CorpusRecord::Product(_) => Corpus::Product,
        }
    }

    /// Text the keyword channel substring-matches against
    pub fn searchable_text(&self) -> String {
        match self {
            CorpusRecord::Faq(faq) => format!("{} {}", faq.question, faq.answer),
            CorpusRecord::Document(chunk) => chunk.content.clone(),
            CorpusRecord::Product(product) => product.searchable_text(),
        }
    }

    pub fn as_product(&self) -> Option<&Product> {
        match self {
            CorpusRecord::Product(product) => Some(product),
            _ => None,
        }
    }

    pub fn as_faq(&self) -> Option<&FaqEntry> {
        match self {
            CorpusRecord::Faq(faq) => Some(faq),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentChunk> {
        match self {
            CorpusRecord::Document(chunk) => Some(chunk),
            _ => None,
        }
    }
}

/// Nearest-neighbour hit returned by a corpus store
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: CorpusRecord,
    /// Cosine distance, `1 - similarity`
    pub distance: f32,
}

impl ScoredRecord {
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Which channel produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Semantic,
    Keyword,
    Hybrid,
}

/// Record plus the score that ranked it in a single retrieval call
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    pub record: CorpusRecord,
    /// Fused score (RRF) or distinct keyword hits (waterfall)
    pub match_score: f32,
    pub source: MatchSource,
    /// Cosine similarity when the semantic channel saw the record
    pub similarity: Option<f32>,
}

impl RetrievalCandidate {
    pub fn id(&self) -> &str {
        self.record.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: "p1".into(),
            title: "Siyah Taşlı Kolye".into(),
            description: "Çelik zincir".into(),
            vendor: Some("Luna".into()),
            product_type: Some("Kolye".into()),
            min_price: Some(100.0),
            max_price: Some(250.0),
            stock: Some(3),
            variants: vec![],
            image_url: None,
            url: None,
        }
    }

    #[test]
    fn test_price_label() {
        let mut p = product();
        assert_eq!(p.price_label().as_deref(), Some("100.00 - 250.00 TL"));
        p.max_price = Some(100.0);
        assert_eq!(p.price_label().as_deref(), Some("100.00 TL"));
        p.min_price = None;
        p.max_price = None;
        assert_eq!(p.price_label(), None);
    }

    #[test]
    fn test_searchable_text_includes_brand_and_category() {
        let record = CorpusRecord::Product(product());
        let text = record.searchable_text();
        assert!(text.contains("Luna"));
        assert!(text.contains("Çelik"));
        assert_eq!(record.corpus(), Corpus::Product);
        assert_eq!(record.id(), "p1");
    }

    #[test]
    fn test_similarity_from_distance() {
        let hit = ScoredRecord {
            record: CorpusRecord::Product(product()),
            distance: 0.25,
        };
        assert!((hit.similarity() - 0.75).abs() < f32::EPSILON);
    }
}
