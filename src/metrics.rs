//! Prometheus metrics for the gateway
//!
//! Every request handled at the edge is counted and timed, labelled by
//! command and reply status.

use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, TextEncoder, opts, register_histogram_vec,
    register_int_counter_vec,
};

/// Total number of requests handled, by command and status
pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("gateway_requests_total", "Total number of gateway requests"),
        &["command", "status"]
    )
    .expect("Failed to register gateway_requests_total metric")
});

/// Request handling latency, by command and status
pub static REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "gateway_request_duration_seconds",
        "Gateway request handling latency in seconds",
        &["command", "status"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register gateway_request_duration_seconds metric")
});

pub fn record_request(command: &str, status: u16, elapsed: Duration) {
    let status = status.to_string();
    let labels = [command, status.as_str()];
    REQUESTS_TOTAL.with_label_values(&labels).inc();
    REQUEST_DURATION
        .with_label_values(&labels)
        .observe(elapsed.as_secs_f64());
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;

    // the text encoder only ever writes UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
