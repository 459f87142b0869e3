//! Server messenger: carries refresh instructions to the other farm nodes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::lock::mutex_lock;
use super::refresher::RefreshInstruction;

const SOURCE: &str = "cache::messenger";
const METRIC_INSTRUCTIONS_DROPPED: &str = "cachebind_instructions_dropped_total";

/// Outbound channel to the rest of the server farm.
pub trait ServerMessenger: Send + Sync {
    /// Hand an instruction over for delivery to every other node.
    fn send(&self, instruction: &RefreshInstruction);
}

/// Messenger for single-server deployments: instructions go nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessenger;

impl ServerMessenger for NullMessenger {
    fn send(&self, instruction: &RefreshInstruction) {
        debug!(refresher = ?instruction.refresher, "Refresh instruction not distributed");
    }
}

/// A serialized instruction waiting to be picked up by other nodes.
#[derive(Debug, Clone)]
pub struct QueuedInstruction {
    pub id: Uuid,
    /// Monotonic within this process.
    pub sequence: u64,
    pub created_at: OffsetDateTime,
    /// JSON encoding of the instruction.
    pub payload: String,
}

impl QueuedInstruction {
    pub fn decode(&self) -> Result<RefreshInstruction, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// Bounded FIFO of serialized instructions.
///
/// When full, the oldest instruction is dropped to make room.
pub struct InstructionQueue {
    queue: Mutex<VecDeque<QueuedInstruction>>,
    limit: usize,
    sequence: AtomicU64,
}

impl InstructionQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            limit: limit.max(1),
            sequence: AtomicU64::new(0),
        }
    }

    /// Drain up to `limit` instructions in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<QueuedInstruction> {
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
}

impl ServerMessenger for InstructionQueue {
    fn send(&self, instruction: &RefreshInstruction) {
        let payload = match serde_json::to_string(instruction) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, refresher = ?instruction.refresher, "Refresh instruction could not be serialized");
                return;
            }
        };

        let queued = QueuedInstruction {
            id: Uuid::new_v4(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            created_at: OffsetDateTime::now_utc(),
            payload,
        };

        let mut queue = mutex_lock(&self.queue, SOURCE, "send");
        if queue.len() >= self.limit
            && let Some(dropped) = queue.pop_front()
        {
            warn!(
                instruction_id = %dropped.id,
                sequence = dropped.sequence,
                limit = self.limit,
                "Instruction queue full, dropping oldest instruction"
            );
            counter!(METRIC_INSTRUCTIONS_DROPPED).increment(1);
        }
        debug!(instruction_id = %queued.id, sequence = queued.sequence, "Refresh instruction queued");
        queue.push_back(queued);
    }
}
