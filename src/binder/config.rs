//! Binder configuration (`[binder]` section of `cachebind.toml`).

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Route events to cache handlers at all.
    pub enabled: bool,
    /// Maximum events dispatched per batch when flushing pending events.
    pub batch_limit: usize,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::BinderSettings> for BinderConfig {
    fn from(settings: &crate::config::BinderSettings) -> Self {
        Self {
            enabled: settings.enabled,
            batch_limit: settings.batch_limit.get(),
        }
    }
}

impl BinderConfig {
    /// Returns the batch limit as NonZeroUsize, clamping to 1 if zero.
    pub fn batch_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.batch_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
