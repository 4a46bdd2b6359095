//! Shared utilities: the broker error taxonomy and logging bootstrap.

pub mod error;
pub mod logging;

pub use error::{BrokerError, BrokerResult, DeliveryError};
