//! Event trigger service.
//!
//! Editing services raise events through the trigger; a flush drains the
//! pending queue batch by batch into the binder.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info};

use super::config::BinderConfig;
use super::dispatcher::{CacheBinder, DispatchReport};
use super::error::BinderError;
use super::events::{EventArgs, EventDefinition, Sender};
use super::queue::PendingEvents;

/// Buffers raised events and hands them to the binder on flush.
///
/// ```ignore
/// // Inside a content save:
/// trigger.raise(sender_types::CONTENT_SERVICE, "Saved", EventArgs::Saved { ids: vec![id] });
/// // When the unit of work completes:
/// trigger.flush()?;
/// ```
pub struct EventTrigger {
    config: BinderConfig,
    queue: Arc<PendingEvents>,
    binder: Arc<CacheBinder>,
}

impl EventTrigger {
    pub fn new(config: BinderConfig, queue: Arc<PendingEvents>, binder: Arc<CacheBinder>) -> Self {
        Self {
            config,
            queue,
            binder,
        }
    }

    /// Queue an event for the next flush.
    pub fn publish(&self, definition: EventDefinition) {
        if !self.config.enabled {
            debug!(
                handler_key = %definition.handler_key(),
                "Event trigger skipped: binder disabled"
            );
            return;
        }

        self.queue.publish(definition);
    }

    pub fn raise(
        &self,
        sender: impl Into<Sender>,
        event_name: impl Into<Cow<'static, str>>,
        args: EventArgs,
    ) {
        self.publish(EventDefinition::new(sender, event_name, args));
    }

    /// Dispatch every pending event, `batch_limit` at a time.
    ///
    /// Reduction applies within each batch. A handler failure stops the
    /// flush; batches not yet drained stay queued.
    pub fn flush(&self) -> Result<DispatchReport, BinderError> {
        let limit = self.config.batch_limit_non_zero().get();
        let mut total = DispatchReport::default();
        let mut batches = 0usize;

        loop {
            let drained = self.queue.drain(limit);
            if drained.is_empty() {
                break;
            }

            let events: Vec<EventDefinition> = drained
                .into_iter()
                .map(|queued| queued.definition)
                .collect();
            total.merge(self.binder.handle_events(&events)?);
            batches += 1;
        }

        if batches > 0 {
            info!(
                batches,
                received = total.received,
                invoked = total.invoked,
                "Pending events flushed"
            );
        }

        Ok(total)
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<PendingEvents> {
        &self.queue
    }

    pub fn binder(&self) -> &Arc<CacheBinder> {
        &self.binder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::context::DefaultContextFactory;
    use crate::binder::events::sender_types::{CONTENT_TYPE_SERVICE, MEMBER_SERVICE};
    use crate::binder::registry::HandlerRegistry;
    use crate::cache::{AppCaches, CacheConfig, CacheRegion, DistributedCache, InstructionQueue};

    struct Fixture {
        trigger: EventTrigger,
        caches: Arc<AppCaches>,
        messenger: Arc<InstructionQueue>,
    }

    fn fixture(config: BinderConfig) -> Fixture {
        let cache_config = CacheConfig::default();
        let caches = Arc::new(AppCaches::new(&cache_config));
        let messenger = Arc::new(InstructionQueue::new(64));
        let cache = Arc::new(DistributedCache::new(
            cache_config,
            Arc::clone(&caches),
            messenger.clone(),
        ));
        let binder = Arc::new(CacheBinder::new(
            config.clone(),
            Arc::new(HandlerRegistry::with_default_handlers().expect("default handlers")),
            Arc::new(DefaultContextFactory::new()),
            cache,
        ));
        let trigger = EventTrigger::new(config, Arc::new(PendingEvents::new()), binder);

        Fixture {
            trigger,
            caches,
            messenger,
        }
    }

    #[test]
    fn flush_dispatches_pending_events() {
        let fx = fixture(BinderConfig::default());
        fx.caches.insert(CacheRegion::Member, 7, serde_json::json!("m"));

        fx.trigger
            .raise(MEMBER_SERVICE, "Saved", EventArgs::Saved { ids: vec![7] });
        assert_eq!(fx.trigger.queue().len(), 1);

        let report = fx.trigger.flush().expect("flush succeeds");
        assert_eq!(report.invoked, 1);
        assert!(fx.trigger.queue().is_empty());
        assert!(!fx.caches.contains(CacheRegion::Member, 7));
        assert_eq!(fx.messenger.len(), 1);
    }

    #[test]
    fn flush_reduces_within_each_batch() {
        let fx = fixture(BinderConfig {
            enabled: true,
            batch_limit: 2,
        });
        for _ in 0..4 {
            fx.trigger.raise(CONTENT_TYPE_SERVICE, "Saved", EventArgs::Empty);
        }

        let report = fx.trigger.flush().expect("flush succeeds");
        assert_eq!(report.received, 4);
        assert_eq!(report.reduced, 2);
        assert_eq!(report.invoked, 2);
    }

    #[test]
    fn flush_of_empty_queue_is_a_no_op() {
        let fx = fixture(BinderConfig::default());
        let report = fx.trigger.flush().expect("flush succeeds");
        assert_eq!(report, DispatchReport::default());
    }

    #[test]
    fn disabled_trigger_queues_nothing() {
        let fx = fixture(BinderConfig {
            enabled: false,
            ..Default::default()
        });
        fx.trigger
            .raise(MEMBER_SERVICE, "Saved", EventArgs::Saved { ids: vec![1] });
        assert!(fx.trigger.queue().is_empty());
    }

    #[test]
    fn failed_batch_leaves_later_batches_queued() {
        let fx = fixture(BinderConfig {
            enabled: true,
            batch_limit: 1,
        });
        fx.trigger.raise(MEMBER_SERVICE, "Saved", EventArgs::Empty);
        fx.trigger
            .raise(MEMBER_SERVICE, "Saved", EventArgs::Saved { ids: vec![1] });

        let err = fx.trigger.flush().expect_err("unexpected payload");
        assert!(matches!(err, BinderError::Handler { .. }));
        assert_eq!(fx.trigger.queue().len(), 1);
    }
}
