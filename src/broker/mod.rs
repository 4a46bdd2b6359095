//! The broker core: topic and subscriber registries, per-topic queues, the
//! dispatcher façade and push notification.

pub mod engine;
pub mod message;
pub mod notifier;
pub mod queue;
pub mod subscriber;
pub mod topic;

pub use engine::Dispatcher;
pub use message::Message;
pub use notifier::{Delivery, HttpDelivery, Notifier, NotifierWorker, PushEvent};
pub use subscriber::Subscriber;

#[cfg(test)]
mod tests;
