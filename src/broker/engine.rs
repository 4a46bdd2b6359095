//! Dispatcher
//!
//! The façade the transport layer calls. It holds no state of its own beyond
//! the registries it composes: every operation resolves the addressed topic
//! or subscriber first, then delegates, and passes sub-component errors
//! through unchanged.
//!
//! Concurrency and usage notes:
//! - The dispatcher is built once and shared as `Arc<Dispatcher>`; all
//!   methods take `&self`.
//! - No operation holds a lock across topics or subscribers. Push
//!   notification is queued only after the publishing queue's lock has been
//!   released.

use crate::broker::message::{Message, MessageId};
use crate::broker::notifier::Notifier;
use crate::broker::queue::QueueLimits;
use crate::broker::subscriber::{Subscriber, SubscriberId, SubscriberRegistry};
use crate::broker::topic::TopicRegistry;
use crate::config::BrokerSettings;
use crate::utils::{BrokerError, BrokerResult};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Dispatcher {
    topics: TopicRegistry,
    subscribers: SubscriberRegistry,
    notifier: Notifier,
}

impl Dispatcher {
    pub fn new(settings: &BrokerSettings, notifier: Notifier) -> Self {
        let limits = QueueLimits {
            max_depth: settings.max_queue_depth,
            max_message_bytes: settings.max_message_bytes,
        };
        Self {
            topics: TopicRegistry::new(limits, settings.max_topics_per_tenant),
            subscribers: SubscriberRegistry::new(),
            notifier,
        }
    }

    pub fn list_topics(&self, tenant: &str) -> Vec<String> {
        self.topics.list(tenant)
    }

    /// Ids of the subscribers watching an existing topic.
    pub fn describe_topic(&self, tenant: &str, topic: &str) -> BrokerResult<Vec<SubscriberId>> {
        if !self.topics.contains(tenant, topic) {
            return Err(BrokerError::TopicNotFound(topic.to_string()));
        }
        Ok(self.subscribers.watcher_ids(tenant, topic))
    }

    pub fn create_topic(&self, tenant: &str, name: &str) -> BrokerResult<String> {
        self.topics.create(tenant, name)?;
        info!(tenant, topic = name, "created topic");
        Ok(name.to_string())
    }

    /// Delete a topic and its unconsumed messages. Subscribers keep their
    /// interest in the name; it stays inert until a topic of that name exists
    /// again.
    pub fn delete_topic(&self, tenant: &str, topic: &str) -> BrokerResult<String> {
        self.topics.delete(tenant, topic)?;
        info!(tenant, topic, "deleted topic");
        Ok(topic.to_string())
    }

    /// Publish `body` and queue push notifications for the topic's watchers.
    pub fn send_message(&self, tenant: &str, topic: &str, body: Vec<u8>) -> BrokerResult<MessageId> {
        let handle = self.topics.get(tenant, topic)?;
        let message_id = handle.queue.publish(body)?;

        let watchers = self.subscribers.watchers_of(tenant, topic);
        debug!(
            tenant,
            topic,
            message_id = %message_id,
            watchers = watchers.len(),
            "message published"
        );
        self.notifier.notify(tenant, topic, &message_id, &watchers);

        Ok(message_id)
    }

    /// Take the oldest message. `Ok(None)` means the queue is empty.
    pub fn pull_message(&self, tenant: &str, topic: &str) -> BrokerResult<Option<Message>> {
        let handle = self.topics.get(tenant, topic)?;
        Ok(handle.queue.pull())
    }

    pub fn delete_message(
        &self,
        tenant: &str,
        topic: &str,
        message_id: &str,
    ) -> BrokerResult<MessageId> {
        let handle = self.topics.get(tenant, topic)?;
        if !handle.queue.delete_by_id(message_id) {
            return Err(BrokerError::MessageNotFound(message_id.to_string()));
        }
        Ok(message_id.to_string())
    }

    pub fn create_subscriber(
        &self,
        tenant: &str,
        name: &str,
        endpoint: &str,
        topics: &[String],
    ) -> BrokerResult<Subscriber> {
        let subscriber = self.subscribers.create(tenant, name, endpoint, topics)?;
        info!(tenant, subscriber = %subscriber.id, name, "created subscriber");
        Ok(subscriber)
    }

    pub fn get_subscriber_info(&self, tenant: &str, id: &str) -> BrokerResult<Subscriber> {
        self.subscribers.get(tenant, id)
    }

    pub fn delete_subscriber(&self, tenant: &str, id: &str) -> BrokerResult<SubscriberId> {
        self.subscribers.delete(tenant, id)?;
        info!(tenant, subscriber = id, "deleted subscriber");
        Ok(id.to_string())
    }

    pub fn subscribe_topic(
        &self,
        tenant: &str,
        id: &str,
        topics: &[String],
    ) -> BrokerResult<Vec<String>> {
        self.subscribers.subscribe(tenant, id, topics)
    }

    pub fn unsubscribe_topic(
        &self,
        tenant: &str,
        id: &str,
        topics: &[String],
    ) -> BrokerResult<Vec<String>> {
        self.subscribers.unsubscribe(tenant, id, topics)
    }
}
