//! Cachebind event binder
//!
//! Routes the domain events raised by editing services to the cache handlers
//! that keep the distributed cache consistent:
//!
//! - **Events**: `(sender, event name, arguments)` triples keyed by
//!   `SenderType_EventName`
//! - **Registry**: resolves a key to its handler, memoizing every lookup
//! - **Reducer**: collapses redundant type-change events within a batch
//! - **Binder**: opens an execution-context scope and dispatches the batch
//! - **Trigger**: buffers raised events until the unit of work flushes
//!
//! ## Configuration
//!
//! ```toml
//! [binder]
//! enabled = true
//! batch_limit = 100
//! ```

mod config;
mod context;
mod dispatcher;
mod error;
mod events;
mod handlers;
mod queue;
mod reducer;
mod registry;
mod trigger;

pub use config::BinderConfig;
pub use context::{
    ContextFactory, ContextOrigin, ContextReference, DefaultContextFactory, ExecutionContext,
    HandlerContext,
};
pub use dispatcher::{CacheBinder, DispatchReport};
pub use error::{BinderError, HandlerError, RegistryError};
pub use events::{
    ContentTypeChange, ContentTypeChangeKind, EventArgs, EventDefinition, HandlerKey,
    ReductionCategory, Sender, TreeChange, TreeChangeKind, sender_types,
};
pub use handlers::DEFAULT_HANDLERS;
pub use queue::{Epoch, PendingEvents, QueuedEvent};
pub use reducer::{ReducedEventBatch, reduce};
pub use registry::{HandlerEntry, HandlerFn, HandlerRegistry};
pub use trigger::EventTrigger;
