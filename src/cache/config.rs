//! Cache configuration.
//!
//! Controls the in-memory application caches and cross-node distribution via
//! the `[caches]` section of `cachebind.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_REGION_CAPACITY: usize = 500;
const DEFAULT_MAX_PENDING_INSTRUCTIONS: usize = 1000;

/// Cache configuration from `cachebind.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries held per cache region before LRU eviction.
    pub region_capacity: usize,
    /// Forward refresh instructions to the other nodes of the farm.
    pub distribute: bool,
    /// Maximum refresh instructions retained for other nodes.
    pub max_pending_instructions: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            region_capacity: DEFAULT_REGION_CAPACITY,
            distribute: true,
            max_pending_instructions: DEFAULT_MAX_PENDING_INSTRUCTIONS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            region_capacity: settings.region_capacity.get(),
            distribute: settings.distribute,
            max_pending_instructions: settings.max_pending_instructions.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the region capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn region_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.region_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the instruction limit, clamping to 1 if zero.
    pub fn max_pending_instructions_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_pending_instructions).unwrap_or(NonZeroUsize::MIN)
    }
}
