//! Execution context scopes.
//!
//! Handlers may run from a background flush as well as from an editing
//! request. Either way they get a request-like [`ExecutionContext`], passed to
//! them explicitly inside a [`HandlerContext`]. The dispatcher holds a
//! [`ContextReference`] for the whole batch and releases it on drop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::cache::DistributedCache;

/// Where an execution context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOrigin {
    /// Created by the dispatcher because no request was in flight.
    Background,
    /// Supplied by the caller's in-flight request.
    Request,
}

/// Request-like ambient state for handlers.
#[derive(Debug)]
pub struct ExecutionContext {
    id: Uuid,
    origin: ContextOrigin,
    created_at: OffsetDateTime,
}

impl ExecutionContext {
    pub fn new(origin: ContextOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> ContextOrigin {
        self.origin
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

type ReleaseFn = Box<dyn FnOnce(&ExecutionContext) + Send>;

/// Scope guard over an execution context.
///
/// A root reference owns its context and runs its release hook exactly once
/// when dropped, on every exit path. A borrowed reference wraps a context
/// owned by someone else and releases nothing.
pub struct ContextReference {
    context: Arc<ExecutionContext>,
    release: Option<ReleaseFn>,
}

impl ContextReference {
    pub fn root(
        context: Arc<ExecutionContext>,
        release: impl FnOnce(&ExecutionContext) + Send + 'static,
    ) -> Self {
        Self {
            context,
            release: Some(Box::new(release)),
        }
    }

    pub fn borrowed(context: Arc<ExecutionContext>) -> Self {
        Self {
            context,
            release: None,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn is_root(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for ContextReference {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(&self.context);
        }
    }
}

impl fmt::Debug for ContextReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextReference")
            .field("context", &self.context)
            .field("is_root", &self.is_root())
            .finish()
    }
}

/// Source of execution contexts for dispatch.
pub trait ContextFactory: Send + Sync {
    /// Acquire a fresh scope; it is released when the reference drops.
    fn ensure_context(&self) -> ContextReference;
}

/// Creates a background context per call and tracks how many are open.
#[derive(Debug, Default)]
pub struct DefaultContextFactory {
    active: Arc<AtomicUsize>,
}

impl DefaultContextFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes acquired and not yet released.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl ContextFactory for DefaultContextFactory {
    fn ensure_context(&self) -> ContextReference {
        let context = Arc::new(ExecutionContext::new(ContextOrigin::Background));
        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::SeqCst);
        debug!(context_id = %context.id(), "Execution context acquired");

        ContextReference::root(context, move |context| {
            active.fetch_sub(1, Ordering::SeqCst);
            debug!(context_id = %context.id(), "Execution context released");
        })
    }
}

/// Everything a handler may touch while it runs.
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub cache: &'a DistributedCache,
    pub execution: &'a ExecutionContext,
}
