//! Embedding cache
//!
//! Wraps any [`Embedder`] with a shared in-memory cache keyed by a BLAKE3
//! hash of the model id and the normalized text. Entries expire after a
//! fixed TTL. Concurrent misses on the same key may both call the inner
//! embedder; the last write wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use support_agent_config::EmbeddingConfig;
use support_agent_core::{Embedder, Result};

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Caching decorator for an embedder
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    entries: Cache<[u8; 32], Arc<Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            entries: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(inner: Arc<dyn Embedder>, config: &EmbeddingConfig) -> Self {
        Self::new(
            inner,
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    fn cache_key(&self, text: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.inner.model_id().as_bytes());
        hasher.update(&[0]);
        hasher.update(normalize_text(text).as_bytes());
        *hasher.finalize().as_bytes()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = self.cache_key(text);

        if let Some(vector) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("support_agent_embedding_cache_total", "result" => "hit").increment(1);
            return Ok(vector.as_ref().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("support_agent_embedding_cache_total", "result" => "miss").increment(1);

        let vector = self.inner.embed(text).await?;
        self.entries.insert(key, Arc::new(vector.clone()));
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Lowercase, trim and collapse whitespace
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingEmbedder {
        calls: AtomicUsize,
        model: &'static str,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        fn model_id(&self) -> &str {
            self.model
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn counting(model: &'static str) -> Arc<CountingEmbedder> {
        Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            model,
        })
    }

    #[tokio::test]
    async fn test_cache_hit_after_miss() {
        let inner = counting("m1");
        let cache = CachedEmbedder::new(inner.clone(), 100, Duration::from_secs(60));

        let first = cache.embed("Siyah kolye").await.unwrap();
        let second = cache.embed("  siyah   KOLYE ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_model_is_part_of_key() {
        let a = CachedEmbedder::new(counting("model-a"), 100, Duration::from_secs(60));
        let b = CachedEmbedder::new(counting("model-b"), 100, Duration::from_secs(60));
        assert_ne!(a.cache_key("kolye"), b.cache_key("kolye"));
        assert_eq!(a.cache_key("kolye"), a.cache_key(" Kolye"));
    }

    #[tokio::test]
    async fn test_clear() {
        let inner = counting("m");
        let cache = CachedEmbedder::new(inner.clone(), 100, Duration::from_secs(60));
        cache.embed("x").await.unwrap();
        cache.clear();
        cache.embed("x").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
