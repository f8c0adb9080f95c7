//! Response cache for generation and embedding results.
//!
//! [`ResponseCache`] maps a [`RequestFingerprint`] to a previously obtained
//! successful response. It is bounded by entry count, evicts the least
//! recently *accessed* entry on overflow, and expires each entry after its
//! own time-to-live.
//!
//! # Architecture
//!
//! The cache sits in [`GenkitClient`](crate::GenkitClient), in front of the
//! [`GenerationBackend`](crate::providers::GenerationBackend). A hit bypasses
//! the backend and its request metrics entirely. Cache hit/miss metrics are
//! emitted separately, labelled by operation.
//!
//! Backed by moka's sync cache with the plain LRU eviction policy and a
//! per-entry [`Expiry`]. moka buffers reads and writes internally; `insert`
//! drains those buffers before returning, so capacity and eviction decisions
//! are settled by the time the caller continues.
//!
//! Only successful generations are ever stored. Failures are refused at
//! [`ResponseCache::insert`], so a transient remote error is retried on the
//! next identical request instead of being pinned.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::debug;

use super::fingerprint::RequestFingerprint;
use crate::telemetry;
use crate::types::{Embedding, GenerateResponse, GenerationResult};

/// Configuration for the response cache.
///
/// ```rust
/// # use genkit_gateway::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Whether responses are cached at all. Default: true.
    pub enabled: bool,
    /// Maximum number of cached entries. Default: 100.
    pub max_entries: u64,
    /// Time-to-live applied to new entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with caching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[derive(Clone, Debug)]
enum CachedResponse {
    Generation(GenerateResponse),
    Embedding(Embedding),
}

#[derive(Clone, Debug)]
struct CacheEntry {
    response: CachedResponse,
    ttl: Duration,
}

/// Expires every entry after the ttl it was inserted with.
struct PerEntryTtl;

impl Expiry<RequestFingerprint, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &RequestFingerprint,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &RequestFingerprint,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded LRU + TTL store of successful responses.
///
/// Safe to share across tasks; all methods take `&self`.
pub struct ResponseCache {
    cache: Cache<RequestFingerprint, CacheEntry>,
    default_ttl: Duration,
}

impl ResponseCache {
    /// Create a cache sized and timed from `config`.
    ///
    /// `config.enabled` is not consulted here; the client decides whether to
    /// allocate a cache at all.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(PerEntryTtl)
            .build();
        Self {
            cache,
            default_ttl: config.ttl,
        }
    }

    /// Time-to-live used by the `*_default` insert helpers.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a cached generation.
    ///
    /// Returns `None` on a miss or once the entry's ttl has elapsed. A hit
    /// counts as an access for LRU ordering.
    pub fn lookup(&self, key: &RequestFingerprint) -> Option<GenerationResult> {
        match self.cache.get(key).map(|entry| entry.response) {
            Some(CachedResponse::Generation(response)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => "generate")
                    .increment(1);
                debug!(operation = "generate", "cache hit");
                Some(response.into())
            }
            _ => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => "generate")
                    .increment(1);
                debug!(operation = "generate", "cache miss");
                None
            }
        }
    }

    /// Insert a generation result with its own time-to-live.
    ///
    /// Failures are not cache-eligible and are dropped; returns whether the
    /// value was stored.
    pub fn insert(&self, key: RequestFingerprint, value: GenerationResult, ttl: Duration) -> bool {
        let response = match value.into_result() {
            Ok(response) => response,
            Err(_) => return false,
        };
        self.store(key, CachedResponse::Generation(response), ttl);
        true
    }

    /// Look up a cached embedding.
    pub fn get_embedding(&self, model: &str, text: &str) -> Option<Embedding> {
        let key = RequestFingerprint::embed(model, text);
        match self.cache.get(&key).map(|entry| entry.response) {
            Some(CachedResponse::Embedding(e)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => "embed").increment(1);
                Some(e)
            }
            _ => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => "embed")
                    .increment(1);
                None
            }
        }
    }

    /// Insert an embedding with the default ttl.
    pub fn insert_embedding(&self, model: &str, text: &str, embedding: Embedding) {
        let key = RequestFingerprint::embed(model, text);
        self.store(key, CachedResponse::Embedding(embedding), self.default_ttl);
    }

    /// Check the cache for several texts at once.
    ///
    /// Returns one `Option` per text, in order: `Some` for hits, `None` for
    /// misses. Forward only the misses and reassemble with
    /// [`merge_batch_results`].
    pub fn get_embedding_batch(&self, model: &str, texts: &[&str]) -> Vec<Option<Embedding>> {
        texts
            .iter()
            .map(|text| self.get_embedding(model, text))
            .collect()
    }

    /// Insert embeddings positionally paired with `texts`.
    pub fn insert_embedding_batch(&self, model: &str, texts: &[&str], embeddings: &[Embedding]) {
        for (text, embedding) in texts.iter().zip(embeddings) {
            self.insert_embedding(model, text, embedding.clone());
        }
    }

    /// Whether `key` is present and unexpired. Does not count as an access.
    pub fn contains(&self, key: &RequestFingerprint) -> bool {
        self.cache.contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn store(&self, key: RequestFingerprint, response: CachedResponse, ttl: Duration) {
        self.cache.insert(key, CacheEntry { response, ttl });
        self.cache.run_pending_tasks();
    }
}

/// Merge cached hits with backend results for a batch.
///
/// `results` holds one embedding per `None` in `cached`, in order. Returns
/// `None` if the backend returned a different number of results than there
/// were misses.
pub(crate) fn merge_batch_results(
    cached: Vec<Option<Embedding>>,
    results: Vec<Embedding>,
) -> Option<Vec<Embedding>> {
    let misses = cached.iter().filter(|c| c.is_none()).count();
    if misses != results.len() {
        return None;
    }
    let mut result_iter = results.into_iter();
    cached
        .into_iter()
        .map(|opt| opt.or_else(|| result_iter.next()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(v: f32) -> Embedding {
        Embedding::new(vec![v], "m")
    }

    #[test]
    fn merge_batch_mixed() {
        let cached = vec![Some(embedding(1.0)), None, Some(embedding(3.0)), None];
        let merged = merge_batch_results(cached, vec![embedding(2.0), embedding(4.0)]).unwrap();
        let values: Vec<f32> = merged.iter().map(|e| e.values[0]).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn merge_batch_all_cached() {
        let cached = vec![Some(embedding(1.0)), Some(embedding(2.0))];
        assert_eq!(merge_batch_results(cached, vec![]).unwrap().len(), 2);
    }

    #[test]
    fn merge_batch_count_mismatch() {
        let cached = vec![None, None];
        assert!(merge_batch_results(cached, vec![embedding(1.0)]).is_none());
    }

    #[test]
    fn failure_is_not_inserted() {
        let cache = ResponseCache::new(&CacheConfig::default());
        let key = RequestFingerprint::embed("m", "k");
        let stored = cache.insert(
            key.clone(),
            GenerationResult::Failure {
                code: "NETWORK_ERROR".into(),
                message: "reset".into(),
            },
            Duration::from_secs(60),
        );
        assert!(!stored);
        assert!(!cache.contains(&key));
        assert!(cache.is_empty());
    }
}
