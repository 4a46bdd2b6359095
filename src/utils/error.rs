//! The `error` module defines the error taxonomy shared by every broker
//! component.
//!
//! Sub-components raise the most specific kind they can determine and the
//! dispatcher passes it through unchanged, so the transport layer can map each
//! kind onto its own response code.

use thiserror::Error;

/// Errors raised by broker operations.
///
/// Everything except `Internal` is an expected operating condition and
/// carries only the name or id that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("topic {0} does not exist")]
    TopicNotFound(String),

    #[error("topic {0} already exists")]
    TopicExists(String),

    #[error("message {0} does not exist")]
    MessageNotFound(String),

    #[error("subscriber {0} does not exist")]
    SubscriberNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type BrokerResult<T> = Result<T, BrokerError>;

/// Failure to hand a push event to a subscriber endpoint.
///
/// Never surfaced to publishers; the notifier only logs it.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("endpoint {endpoint} answered with status {status}")]
    Rejected { endpoint: String, status: u16 },
}
