//! In-memory application caches.
//!
//! One LRU map per [`CacheRegion`]. Handlers only ever remove entries; reads
//! repopulate them from the content repository on the next access.

use std::collections::HashMap;
use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;
use serde_json::Value;

use super::config::CacheConfig;
use super::keys::{CacheRegion, EntityId};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HIT: &str = "cachebind_cache_hit_total";
const METRIC_CACHE_MISS: &str = "cachebind_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "cachebind_cache_evict_total";

/// Cached value of an entity, as read from the content repository.
pub type CachedItem = Value;

/// Region-partitioned in-memory caches of a single node.
pub struct AppCaches {
    regions: HashMap<CacheRegion, RwLock<LruCache<EntityId, CachedItem>>>,
}

impl AppCaches {
    /// Create empty caches sized from the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.region_capacity_non_zero();
        let regions = CacheRegion::ALL
            .into_iter()
            .map(|region| (region, RwLock::new(LruCache::new(capacity))))
            .collect();

        Self { regions }
    }

    fn region(&self, region: CacheRegion) -> &RwLock<LruCache<EntityId, CachedItem>> {
        // Every region is inserted in `new`.
        &self.regions[&region]
    }

    pub fn get(&self, region: CacheRegion, id: EntityId) -> Option<CachedItem> {
        let value = rw_write(self.region(region), SOURCE, "get").get(&id).cloned();
        let metric = if value.is_some() {
            METRIC_CACHE_HIT
        } else {
            METRIC_CACHE_MISS
        };
        counter!(metric, "region" => region.as_str()).increment(1);
        value
    }

    pub fn contains(&self, region: CacheRegion, id: EntityId) -> bool {
        rw_read(self.region(region), SOURCE, "contains").contains(&id)
    }

    pub fn insert(&self, region: CacheRegion, id: EntityId, value: CachedItem) {
        let evicted = rw_write(self.region(region), SOURCE, "insert").push(id, value);
        if let Some((evicted_id, _)) = evicted
            && evicted_id != id
        {
            counter!(METRIC_CACHE_EVICT, "region" => region.as_str()).increment(1);
        }
    }

    /// Remove one entry. Returns true if it was present.
    pub fn evict(&self, region: CacheRegion, id: EntityId) -> bool {
        rw_write(self.region(region), SOURCE, "evict")
            .pop(&id)
            .is_some()
    }

    /// Remove every entry of a region. Returns the number removed.
    pub fn clear(&self, region: CacheRegion) -> usize {
        let mut guard = rw_write(self.region(region), SOURCE, "clear");
        let removed = guard.len();
        guard.clear();
        removed
    }

    pub fn len(&self, region: CacheRegion) -> usize {
        rw_read(self.region(region), SOURCE, "len").len()
    }

    pub fn is_empty(&self, region: CacheRegion) -> bool {
        self.len(region) == 0
    }

    /// Total number of entries across all regions.
    pub fn total_len(&self) -> usize {
        CacheRegion::ALL
            .into_iter()
            .map(|region| self.len(region))
            .sum()
    }

    /// Sorted ids currently cached in a region.
    pub fn ids(&self, region: CacheRegion) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = rw_read(self.region(region), SOURCE, "ids")
            .iter()
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for AppCaches {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
