//! Pending domain events.
//!
//! Editing services publish events here as they raise them; the trigger
//! drains them in batches into the binder.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::cache::mutex_lock;

use super::events::EventDefinition;

const SOURCE: &str = "binder::queue";

/// Monotonic position of an event within this process.
pub type Epoch = u64;

/// A published event with its queue envelope.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub raised_at: OffsetDateTime,
    pub definition: EventDefinition,
}

/// In-memory FIFO of raised events awaiting dispatch.
pub struct PendingEvents {
    queue: Mutex<VecDeque<QueuedEvent>>,
    epoch_counter: AtomicU64,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, definition: EventDefinition) {
        let event = QueuedEvent {
            id: Uuid::new_v4(),
            epoch: self.next_epoch(),
            raised_at: OffsetDateTime::now_utc(),
            definition,
        };

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            handler_key = %event.definition.handler_key(),
            "Domain event queued"
        );

        mutex_lock(&self.queue, SOURCE, "publish").push_back(event);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<QueuedEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        queue.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
    }
}

impl Default for PendingEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::binder::events::EventArgs;

    fn saved(sender: &'static str) -> EventDefinition {
        EventDefinition::new(sender, "Saved", EventArgs::Saved { ids: vec![1] })
    }

    #[test]
    fn publish_and_drain_fifo() {
        let queue = PendingEvents::new();
        queue.publish(saved("MemberService"));
        queue.publish(saved("DomainService"));
        queue.publish(saved("MacroService"));

        let events = queue.drain(2);
        assert_eq!(events.len(), 2);
        assert_eq!(queue.len(), 1);
        assert!(events[0].epoch < events[1].epoch);
        assert_eq!(events[0].definition.sender().type_name(), "MemberService");
        assert_eq!(events[1].definition.sender().type_name(), "DomainService");
    }

    #[test]
    fn clear_queue() {
        let queue = PendingEvents::new();
        queue.publish(saved("MemberService"));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn pending_events_recover_from_poisoned_lock() {
        let queue = PendingEvents::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = queue.queue.lock().expect("queue lock should be acquired");
            panic!("poison queue lock");
        }));

        queue.publish(saved("MemberService"));
        assert_eq!(queue.len(), 1);
    }
}
