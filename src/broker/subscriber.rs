//! Subscriber management
//!
//! Each subscriber record sits behind its own lock, so subscribe, unsubscribe
//! and delete on one id serialize while different ids proceed independently.
//! A `(tenant, topic) -> ids` index is maintained alongside the records and is
//! only ever updated while the owning subscriber's lock is held.
//!
//! Subscribers are tenant-scoped: a record created under one tenant is
//! reported as missing to every other tenant.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::broker::topic::TopicKey;
use crate::utils::{BrokerError, BrokerResult};

pub type SubscriberId = String;

/// Snapshot of a subscriber record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub tenant: String,
    pub name: String,
    pub endpoint: String,
    pub topics: BTreeSet<String>,
}

#[derive(Debug)]
struct SubscriberState {
    record: Subscriber,
    deleted: bool,
}

type SubscriberSlot = Arc<Mutex<SubscriberState>>;

#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, SubscriberSlot>,
    watchers: DashMap<TopicKey, BTreeSet<SubscriberId>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber watching `topics`. The topic list must not be
    /// empty; the topics themselves need not exist yet.
    pub fn create(
        &self,
        tenant: &str,
        name: &str,
        endpoint: &str,
        topics: &[String],
    ) -> BrokerResult<Subscriber> {
        if topics.is_empty() {
            return Err(BrokerError::InvalidArgument(
                "a subscriber needs at least one topic".to_string(),
            ));
        }
        if name.is_empty() || endpoint.is_empty() {
            return Err(BrokerError::InvalidArgument(
                "subscriber name and endpoint must not be empty".to_string(),
            ));
        }

        let record = Subscriber {
            id: Uuid::new_v4().to_string(),
            tenant: tenant.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            topics: topics.iter().cloned().collect(),
        };
        let id = record.id.clone();
        let slot = Arc::new(Mutex::new(SubscriberState {
            record: record.clone(),
            deleted: false,
        }));

        // hold the record lock until the index reflects it
        let state = slot.lock();
        self.subscribers.insert(id.clone(), Arc::clone(&slot));
        for topic in &state.record.topics {
            self.index_add(tenant, topic, &id);
        }
        drop(state);

        debug!(tenant, subscriber = %id, "subscriber created");
        Ok(record)
    }

    pub fn get(&self, tenant: &str, id: &str) -> BrokerResult<Subscriber> {
        let slot = self.slot(tenant, id)?;
        let state = slot.lock();
        if state.deleted {
            return Err(BrokerError::SubscriberNotFound(id.to_string()));
        }
        Ok(state.record.clone())
    }

    pub fn delete(&self, tenant: &str, id: &str) -> BrokerResult<()> {
        let slot = self.slot(tenant, id)?;
        let mut state = slot.lock();
        if state.deleted {
            return Err(BrokerError::SubscriberNotFound(id.to_string()));
        }
        state.deleted = true;
        self.subscribers.remove(id);
        for topic in &state.record.topics {
            self.index_remove(tenant, topic, id);
        }

        debug!(tenant, subscriber = id, "subscriber deleted");
        Ok(())
    }

    /// Add `topics` to the interest set; returns the names that were newly
    /// added, in request order.
    pub fn subscribe(&self, tenant: &str, id: &str, topics: &[String]) -> BrokerResult<Vec<String>> {
        self.update(tenant, id, |state| {
            let mut added = Vec::new();
            for topic in topics {
                if state.record.topics.insert(topic.clone()) {
                    self.index_add(tenant, topic, id);
                    added.push(topic.clone());
                }
            }
            added
        })
    }

    /// Remove `topics` from the interest set; returns the names actually
    /// removed, in request order.
    pub fn unsubscribe(
        &self,
        tenant: &str,
        id: &str,
        topics: &[String],
    ) -> BrokerResult<Vec<String>> {
        self.update(tenant, id, |state| {
            let mut removed = Vec::new();
            for topic in topics {
                if state.record.topics.remove(topic) {
                    self.index_remove(tenant, topic, id);
                    removed.push(topic.clone());
                }
            }
            removed
        })
    }

    /// Subscribers currently watching `topic` under `tenant`.
    pub fn watchers_of(&self, tenant: &str, topic: &str) -> Vec<Subscriber> {
        let ids: Vec<SubscriberId> = match self.watchers.get(&TopicKey::new(tenant, topic)) {
            Some(entry) => entry.value().iter().cloned().collect(),
            None => return Vec::new(),
        };

        ids.iter()
            .filter_map(|id| self.subscribers.get(id).map(|s| Arc::clone(s.value())))
            .filter_map(|slot| {
                let state = slot.lock();
                (!state.deleted && state.record.topics.contains(topic))
                    .then(|| state.record.clone())
            })
            .collect()
    }

    /// Ids of the subscribers watching `topic` under `tenant`.
    pub fn watcher_ids(&self, tenant: &str, topic: &str) -> Vec<SubscriberId> {
        self.watchers_of(tenant, topic)
            .into_iter()
            .map(|s| s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Number of `(tenant, topic)` keys in the watcher index.
    #[cfg(test)]
    pub(crate) fn indexed_topics(&self) -> usize {
        self.watchers.len()
    }

    fn update<R>(
        &self,
        tenant: &str,
        id: &str,
        apply: impl FnOnce(&mut SubscriberState) -> R,
    ) -> BrokerResult<R> {
        let slot = self.slot(tenant, id)?;
        let mut state = slot.lock();
        if state.deleted {
            return Err(BrokerError::SubscriberNotFound(id.to_string()));
        }
        Ok(apply(&mut state))
    }

    fn slot(&self, tenant: &str, id: &str) -> BrokerResult<SubscriberSlot> {
        let slot = self
            .subscribers
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BrokerError::SubscriberNotFound(id.to_string()))?;

        // tenant never changes after creation, but it lives under the lock
        if slot.lock().record.tenant != tenant {
            return Err(BrokerError::SubscriberNotFound(id.to_string()));
        }
        Ok(slot)
    }

    fn index_add(&self, tenant: &str, topic: &str, id: &str) {
        self.watchers
            .entry(TopicKey::new(tenant, topic))
            .or_default()
            .insert(id.to_string());
    }

    fn index_remove(&self, tenant: &str, topic: &str, id: &str) {
        let key = TopicKey::new(tenant, topic);
        if let Some(mut ids) = self.watchers.get_mut(&key) {
            ids.remove(id);
        }
        self.watchers.remove_if(&key, |_, ids| ids.is_empty());
    }
}
