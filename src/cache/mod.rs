//! Cachebind cache layer
//!
//! Holds the node-local application caches and the machinery that keeps every
//! node of a server farm in agreement about what they contain:
//!
//! - **AppCaches**: region-partitioned LRU maps of entity values
//! - **Refreshers**: per entity kind, translate an instruction into evictions
//! - **DistributedCache**: applies an instruction locally, then hands it to
//!   the server messenger for the other nodes
//!
//! ## Configuration
//!
//! ```toml
//! [caches]
//! region_capacity = 500
//! distribute = true
//! max_pending_instructions = 1000
//! ```

mod config;
mod distributed;
mod keys;
mod lock;
mod messenger;
mod refresher;
mod store;

pub use config::CacheConfig;
pub use distributed::DistributedCache;
pub use keys::{CacheRegion, EntityId};
pub use messenger::{InstructionQueue, NullMessenger, QueuedInstruction, ServerMessenger};
pub use refresher::{RefreshAction, RefreshInstruction, Refresher};
pub use store::{AppCaches, CachedItem};

pub(crate) use lock::mutex_lock;
