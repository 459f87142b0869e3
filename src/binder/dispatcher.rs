//! Context-scoped event dispatch.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::DistributedCache;

use super::config::BinderConfig;
use super::context::{ContextFactory, ContextReference, ExecutionContext, HandlerContext};
use super::error::BinderError;
use super::events::{EventDefinition, HandlerKey};
use super::reducer::reduce;
use super::registry::HandlerRegistry;

const METRIC_EVENTS_RECEIVED: &str = "cachebind_events_received_total";
const METRIC_EVENTS_DROPPED: &str = "cachebind_events_dropped_total";
const METRIC_HANDLERS_INVOKED: &str = "cachebind_handlers_invoked_total";
const METRIC_DISPATCH_MS: &str = "cachebind_dispatch_ms";

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Events handed to the binder.
    pub received: usize,
    /// Events left after reduction.
    pub reduced: usize,
    /// Handlers run to completion.
    pub invoked: usize,
    /// Keys of events without a handler, in dispatch order.
    pub dropped: Vec<HandlerKey>,
}

impl DispatchReport {
    pub fn merge(&mut self, other: DispatchReport) {
        self.received += other.received;
        self.reduced += other.reduced;
        self.invoked += other.invoked;
        self.dropped.extend(other.dropped);
    }
}

/// Routes domain events to cache handlers.
///
/// The binder opens an execution-context scope per call, reduces the batch,
/// and invokes the handler registered for each surviving event. Events with
/// no handler are logged and skipped. A failing handler aborts the batch;
/// the scope is still released.
pub struct CacheBinder {
    config: BinderConfig,
    registry: Arc<HandlerRegistry>,
    contexts: Arc<dyn ContextFactory>,
    cache: Arc<DistributedCache>,
}

impl CacheBinder {
    pub fn new(
        config: BinderConfig,
        registry: Arc<HandlerRegistry>,
        contexts: Arc<dyn ContextFactory>,
        cache: Arc<DistributedCache>,
    ) -> Self {
        Self {
            config,
            registry,
            contexts,
            cache,
        }
    }

    /// Dispatch a batch inside a freshly acquired execution context.
    #[instrument(skip_all, fields(received = events.len()))]
    pub fn handle_events(
        &self,
        events: &[EventDefinition],
    ) -> Result<DispatchReport, BinderError> {
        if !self.config.enabled {
            debug!("Cache binder disabled, events ignored");
            return Ok(DispatchReport {
                received: events.len(),
                ..Default::default()
            });
        }

        let scope = self.contexts.ensure_context();
        self.dispatch(&scope, events)
    }

    /// Dispatch a batch inside a context the caller already holds, such as
    /// the one of an in-flight editing request.
    #[instrument(skip_all, fields(received = events.len(), context_id = %context.id()))]
    pub fn handle_events_in(
        &self,
        context: &Arc<ExecutionContext>,
        events: &[EventDefinition],
    ) -> Result<DispatchReport, BinderError> {
        if !self.config.enabled {
            debug!("Cache binder disabled, events ignored");
            return Ok(DispatchReport {
                received: events.len(),
                ..Default::default()
            });
        }

        let scope = ContextReference::borrowed(Arc::clone(context));
        self.dispatch(&scope, events)
    }

    fn dispatch(
        &self,
        scope: &ContextReference,
        events: &[EventDefinition],
    ) -> Result<DispatchReport, BinderError> {
        let started_at = Instant::now();
        let reduced = reduce(events);
        let mut report = DispatchReport {
            received: events.len(),
            reduced: reduced.len(),
            ..Default::default()
        };
        counter!(METRIC_EVENTS_RECEIVED).increment(events.len() as u64);

        info!(
            received = report.received,
            reduced = report.reduced,
            context_id = %scope.context().id(),
            "Cache event dispatch starting"
        );

        let context = HandlerContext {
            cache: &self.cache,
            execution: scope.context(),
        };

        for event in reduced.iter() {
            let Some(handler) = self.registry.resolve(event) else {
                let key = event.handler_key();
                warn!(
                    event_name = %key,
                    "Dropping event {key} because no corresponding handler was found."
                );
                counter!(METRIC_EVENTS_DROPPED).increment(1);
                report.dropped.push(key);
                continue;
            };

            debug!(handler = handler.name(), "Invoking cache handler");
            if let Err(source) = handler.invoke(&context, event.sender(), event.args()) {
                histogram!(METRIC_DISPATCH_MS)
                    .record(started_at.elapsed().as_secs_f64() * 1000.0);
                warn!(
                    handler = handler.name(),
                    invoked = report.invoked,
                    error = %source,
                    "Cache event dispatch aborted"
                );
                return Err(BinderError::Handler {
                    key: event.handler_key(),
                    source,
                });
            }
            counter!(METRIC_HANDLERS_INVOKED).increment(1);
            report.invoked += 1;
        }

        histogram!(METRIC_DISPATCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(
            invoked = report.invoked,
            dropped = report.dropped.len(),
            "Cache event dispatch complete"
        );

        Ok(report)
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<DistributedCache> {
        &self.cache
    }
}
