//! Topic management
//!
//! The `TopicRegistry` owns topic existence for every tenant. Topics live in a
//! sharded map keyed by `(tenant, name)`; creation goes through the map's
//! entry API, which makes the exists-check and the insert one atomic step per
//! key without a registry-wide lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::broker::queue::{MessageQueue, QueueLimits};
use crate::utils::{BrokerError, BrokerResult};

/// Key of a topic: owning tenant plus topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicKey {
    pub tenant: String,
    pub name: String,
}

impl TopicKey {
    pub fn new(tenant: &str, name: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            name: name.to_string(),
        }
    }
}

/// A live topic and its queue.
#[derive(Debug)]
pub struct Topic {
    pub name: String,
    pub queue: MessageQueue,
    created_seq: u64,
}

#[derive(Debug)]
pub struct TopicRegistry {
    topics: DashMap<TopicKey, Arc<Topic>>,
    limits: QueueLimits,
    max_topics_per_tenant: usize,
    creation_counter: AtomicU64,
}

impl TopicRegistry {
    pub fn new(limits: QueueLimits, max_topics_per_tenant: usize) -> Self {
        Self {
            topics: DashMap::new(),
            limits,
            max_topics_per_tenant,
            creation_counter: AtomicU64::new(0),
        }
    }

    /// Names of all topics owned by `tenant`, in creation order.
    pub fn list(&self, tenant: &str) -> Vec<String> {
        let mut owned: Vec<(u64, String)> = self
            .topics
            .iter()
            .filter(|entry| entry.key().tenant == tenant)
            .map(|entry| (entry.value().created_seq, entry.key().name.clone()))
            .collect();
        owned.sort_unstable_by_key(|(seq, _)| *seq);
        owned.into_iter().map(|(_, name)| name).collect()
    }

    pub fn get(&self, tenant: &str, name: &str) -> BrokerResult<Arc<Topic>> {
        self.topics
            .get(&TopicKey::new(tenant, name))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BrokerError::TopicNotFound(name.to_string()))
    }

    pub fn contains(&self, tenant: &str, name: &str) -> bool {
        self.topics.contains_key(&TopicKey::new(tenant, name))
    }

    /// Create a topic with an empty queue. Exactly one of several concurrent
    /// creators of the same name succeeds; the others see `TopicExists`.
    pub fn create(&self, tenant: &str, name: &str) -> BrokerResult<()> {
        if name.is_empty() {
            return Err(BrokerError::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        // soft cap: counted before the entry is taken, since counting visits every shard
        if self.count_for(tenant) >= self.max_topics_per_tenant {
            return Err(BrokerError::CapacityExceeded(format!(
                "tenant {tenant} already owns {} topics",
                self.max_topics_per_tenant
            )));
        }

        match self.topics.entry(TopicKey::new(tenant, name)) {
            Entry::Occupied(_) => Err(BrokerError::TopicExists(name.to_string())),
            Entry::Vacant(slot) => {
                let created_seq = self.creation_counter.fetch_add(1, Ordering::Relaxed);
                slot.insert(Arc::new(Topic {
                    name: name.to_string(),
                    queue: MessageQueue::new(name, self.limits),
                    created_seq,
                }));
                debug!(tenant, topic = name, "topic created");
                Ok(())
            }
        }
    }

    /// Remove a topic and discard its unconsumed messages.
    pub fn delete(&self, tenant: &str, name: &str) -> BrokerResult<()> {
        let (_, topic) = self
            .topics
            .remove(&TopicKey::new(tenant, name))
            .ok_or_else(|| BrokerError::TopicNotFound(name.to_string()))?;

        let dropped = topic.queue.close();
        debug!(tenant, topic = name, dropped, "topic deleted");
        Ok(())
    }

    fn count_for(&self, tenant: &str) -> usize {
        self.topics
            .iter()
            .filter(|entry| entry.key().tenant == tenant)
            .count()
    }
}
