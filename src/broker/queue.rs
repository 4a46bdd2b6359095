//! Per-topic FIFO message storage.
//!
//! Every queue guards its own state with a dedicated lock, so publish and
//! pull on one topic serialize with each other without touching any other
//! topic. Message ids come from a per-queue sequence and are never reused
//! while the queue lives; a recreated topic gets a fresh queue and therefore
//! a fresh sequence.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::broker::message::{Message, MessageId};
use crate::utils::{BrokerError, BrokerResult};

/// Limits enforced on publish.
#[derive(Debug, Clone, Copy)]
pub struct QueueLimits {
    pub max_depth: usize,
    pub max_message_bytes: usize,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    message: Message,
}

#[derive(Debug, Default)]
struct QueueState {
    next_seq: u64,
    entries: VecDeque<Entry>,
    closed: bool,
}

#[derive(Debug)]
pub struct MessageQueue {
    topic: String,
    limits: QueueLimits,
    state: Mutex<QueueState>,
}

impl MessageQueue {
    pub fn new(topic: &str, limits: QueueLimits) -> Self {
        Self {
            topic: topic.to_string(),
            limits,
            state: Mutex::new(QueueState {
                next_seq: 1,
                ..QueueState::default()
            }),
        }
    }

    /// Append a message to the tail and return its id.
    ///
    /// Fails with `CapacityExceeded` when the body is too large or the queue
    /// is full, and with `TopicNotFound` once the queue has been closed.
    pub fn publish(&self, body: Vec<u8>) -> BrokerResult<MessageId> {
        if body.len() > self.limits.max_message_bytes {
            return Err(BrokerError::CapacityExceeded(format!(
                "message of {} bytes exceeds the {} byte limit",
                body.len(),
                self.limits.max_message_bytes
            )));
        }

        let mut state = self.state.lock();
        if state.closed {
            return Err(BrokerError::TopicNotFound(self.topic.clone()));
        }
        if state.entries.len() >= self.limits.max_depth {
            return Err(BrokerError::CapacityExceeded(format!(
                "topic {} already holds {} messages",
                self.topic, self.limits.max_depth
            )));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let id = seq.to_string();
        state.entries.push_back(Entry {
            seq,
            message: Message {
                id: id.clone(),
                topic: self.topic.clone(),
                body,
                published_at: chrono::Utc::now().timestamp_millis(),
            },
        });

        Ok(id)
    }

    /// Remove and return the oldest message, or `None` when empty.
    pub fn pull(&self) -> Option<Message> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.entries.pop_front().map(|e| e.message)
    }

    /// Remove the message with `id` wherever it sits in the queue.
    pub fn delete_by_id(&self, id: &str) -> bool {
        // ids are decimal sequence numbers; anything else was never issued here
        let Ok(seq) = id.parse::<u64>() else {
            return false;
        };
        if seq.to_string() != id {
            return false;
        }

        let mut state = self.state.lock();
        // entries stay sorted by seq, since they are only appended in order
        match state.entries.binary_search_by_key(&seq, |e| e.seq) {
            Ok(index) => state.entries.remove(index).is_some(),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detach the queue from its topic and drop every unconsumed message.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let dropped = state.entries.len();
        state.entries.clear();
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
