//! Push notification delivery
//!
//! `Notifier` is the cheap, cloneable handle the dispatcher calls after a
//! successful publish. It only enqueues onto an unbounded channel, so it never
//! blocks the publisher. `NotifierWorker` drains that channel on a background
//! task and fans each event out to the watchers' endpoints through a
//! `Delivery` implementation. At most `max_in_flight` notifications are being
//! delivered at any time; further ones wait in the channel.
//!
//! Delivery is at-most-once: failures are logged and dropped, never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::broker::subscriber::{Subscriber, SubscriberId};
use crate::utils::DeliveryError;

/// The lightweight event pushed to a subscriber endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEvent {
    pub tenant: String,
    pub topic: String,
    pub message_id: String,
    pub subscriber_id: SubscriberId,
}

/// Moves a push event to an endpoint.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, endpoint: &str, event: &PushEvent) -> Result<(), DeliveryError>;
}

/// Delivers events as a JSON `POST` to the subscriber's endpoint URL.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
}

impl HttpDelivery {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Delivery for HttpDelivery {
    async fn deliver(&self, endpoint: &str, event: &PushEvent) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(endpoint)
            .json(event)
            .send()
            .await
            .map_err(|source| DeliveryError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Target {
    subscriber_id: SubscriberId,
    endpoint: String,
}

#[derive(Debug)]
struct Notification {
    tenant: String,
    topic: String,
    message_id: String,
    targets: Vec<Target>,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

pub struct NotifierWorker {
    rx: mpsc::UnboundedReceiver<Notification>,
    delivery: Arc<dyn Delivery>,
    permits: Arc<Semaphore>,
}

impl Notifier {
    /// Create the handle and the worker that serves it. The worker does
    /// nothing until `run` is awaited, typically via `tokio::spawn`.
    pub fn new(delivery: Arc<dyn Delivery>, max_in_flight: usize) -> (Self, NotifierWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = NotifierWorker {
            rx,
            delivery,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        };
        (Self { tx }, worker)
    }

    /// Queue one push event per watcher. `watchers` is the snapshot taken at
    /// publish time; later subscribers are not included.
    pub fn notify(&self, tenant: &str, topic: &str, message_id: &str, watchers: &[Subscriber]) {
        if watchers.is_empty() {
            return;
        }

        let notification = Notification {
            tenant: tenant.to_string(),
            topic: topic.to_string(),
            message_id: message_id.to_string(),
            targets: watchers
                .iter()
                .map(|s| Target {
                    subscriber_id: s.id.clone(),
                    endpoint: s.endpoint.clone(),
                })
                .collect(),
        };

        if self.tx.send(notification).is_err() {
            warn!(tenant, topic, message_id, "notifier worker is gone, push dropped");
        }
    }
}

impl NotifierWorker {
    pub async fn run(mut self) {
        while let Some(notification) = self.rx.recv().await {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let delivery = Arc::clone(&self.delivery);
            tokio::spawn(async move {
                deliver_all(delivery, notification).await;
                drop(permit);
            });
        }
        debug!("notifier worker stopped");
    }
}

async fn deliver_all(delivery: Arc<dyn Delivery>, notification: Notification) {
    let Notification {
        tenant,
        topic,
        message_id,
        targets,
    } = notification;

    let attempts = targets.into_iter().map(|target| {
        let delivery = Arc::clone(&delivery);
        let event = PushEvent {
            tenant: tenant.clone(),
            topic: topic.clone(),
            message_id: message_id.clone(),
            subscriber_id: target.subscriber_id,
        };
        async move {
            match delivery.deliver(&target.endpoint, &event).await {
                Ok(()) => debug!(
                    subscriber = %event.subscriber_id,
                    topic = %event.topic,
                    message_id = %event.message_id,
                    "push delivered"
                ),
                Err(e) => warn!(
                    subscriber = %event.subscriber_id,
                    topic = %event.topic,
                    message_id = %event.message_id,
                    error = %e,
                    "push delivery failed"
                ),
            }
        }
    });

    join_all(attempts).await;
}
