//! Result cache: LRU with TTL over (operation, normalized args), plus a
//! static invalidation map — each write operation clears the read
//! operations declared dependent on it.

use std::time::Duration;

use dashmap::DashMap;
use moka::sync::Cache;
use tracing::debug;

use engram_core::config::CacheConfig;
use engram_core::models::RecallHit;

/// Which read operations each write operation invalidates.
const INVALIDATION_MAP: &[(&str, &[&str])] = &[
    ("store", &["recall", "graph_query"]),
    ("update", &["recall", "graph_query"]),
    ("forget", &["recall", "graph_query"]),
    ("remember_event", &["recall"]),
    ("consolidate", &["recall", "graph_query"]),
    ("inhibit", &["recall"]),
];

/// One moka cache per read operation, so invalidation is a whole-cache
/// clear rather than a scan.
pub struct ResultCache {
    caches: DashMap<&'static str, Cache<String, Vec<RecallHit>>>,
    config: CacheConfig,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            caches: DashMap::new(),
            config,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Cache key from operation arguments. Arguments are normalized
    /// (trimmed, lowercased, joined) before hashing.
    pub fn key(project_id: &str, parts: &[&str]) -> String {
        let normalized: Vec<String> = parts
            .iter()
            .map(|p| p.trim().to_lowercase())
            .collect();
        let digest = blake3::hash(normalized.join("\x1f").as_bytes());
        format!("{project_id}:{}", digest.to_hex())
    }

    fn cache_for(&self, operation: &'static str) -> Cache<String, Vec<RecallHit>> {
        self.caches
            .entry(operation)
            .or_insert_with(|| {
                Cache::builder()
                    .max_capacity(self.config.max_size)
                    .time_to_live(Duration::from_millis(self.config.default_ttl_ms))
                    .build()
            })
            .clone()
    }

    pub fn get(&self, operation: &'static str, key: &str) -> Option<Vec<RecallHit>> {
        if !self.config.enabled {
            return None;
        }
        self.cache_for(operation).get(key)
    }

    pub fn put(&self, operation: &'static str, key: String, hits: Vec<RecallHit>) {
        if !self.config.enabled {
            return;
        }
        self.cache_for(operation).insert(key, hits);
    }

    /// Invalidate every read operation dependent on `write_operation`.
    pub fn invalidate_for(&self, write_operation: &str) {
        let Some((_, dependents)) = INVALIDATION_MAP
            .iter()
            .find(|(write, _)| *write == write_operation)
        else {
            return;
        };
        for dependent in *dependents {
            if let Some(cache) = self.caches.get(dependent) {
                cache.invalidate_all();
                debug!(write = write_operation, read = dependent, "cache invalidated");
            }
        }
    }
}
