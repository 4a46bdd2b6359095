//! # Tenant Gateway
//!
//! `tenant-gateway` is an in-memory, multi-tenant messaging gateway. Each
//! tenant owns a namespace of named topics; each topic holds a FIFO queue that
//! clients pull from, and subscribers registered by the tenant receive push
//! notifications when topics they watch accept new messages.
//!
//! ## Core Modules
//!
//! - `broker`: topic and subscriber registries, per-topic queues, the
//!   `Dispatcher` façade and the push `Notifier`.
//! - `config`: layered configuration loading.
//! - `metrics`: Prometheus request counters and latency histograms.
//! - `transport`: the WebSocket edge, its wire protocol and status mapping,
//!   and the HTTP endpoint that serves metrics.
//! - `utils`: the error taxonomy and logging bootstrap.

pub mod broker;
pub mod config;
pub mod metrics;
pub mod transport;
pub mod utils;
