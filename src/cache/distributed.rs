//! Farm-wide cache refresh façade used by the event handlers.

use std::sync::Arc;

use tracing::debug;

use super::config::CacheConfig;
use super::keys::EntityId;
use super::messenger::ServerMessenger;
use super::refresher::{RefreshInstruction, Refresher};
use super::store::AppCaches;

/// Applies refresh instructions locally and forwards them to the farm.
pub struct DistributedCache {
    config: CacheConfig,
    caches: Arc<AppCaches>,
    messenger: Arc<dyn ServerMessenger>,
}

impl DistributedCache {
    pub fn new(
        config: CacheConfig,
        caches: Arc<AppCaches>,
        messenger: Arc<dyn ServerMessenger>,
    ) -> Self {
        Self {
            config,
            caches,
            messenger,
        }
    }

    /// Drop everything the refresher owns on every node.
    pub fn refresh_all(&self, refresher: Refresher) {
        self.execute(RefreshInstruction::refresh_all(refresher));
    }

    /// Drop the given entries on every node so they are reloaded.
    pub fn refresh_by_ids(&self, refresher: Refresher, ids: &[EntityId]) {
        if ids.is_empty() {
            return;
        }
        self.execute(RefreshInstruction::refresh_by_ids(refresher, ids.to_vec()));
    }

    /// Drop the given entries on every node because they were deleted.
    pub fn remove_by_ids(&self, refresher: Refresher, ids: &[EntityId]) {
        if ids.is_empty() {
            return;
        }
        self.execute(RefreshInstruction::remove_by_ids(refresher, ids.to_vec()));
    }

    fn execute(&self, instruction: RefreshInstruction) {
        let removed = instruction.apply(&self.caches);
        debug!(
            refresher = ?instruction.refresher,
            action = ?instruction.action,
            removed,
            distribute = self.config.distribute,
            "Refresh instruction applied locally"
        );

        if self.config.distribute {
            self.messenger.send(&instruction);
        }
    }

    pub fn caches(&self) -> &Arc<AppCaches> {
        &self.caches
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
