//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by method, status, outcome
//! - `dispatch_timeouts_total` (counter): chains abandoned at the deadline
//! - `dispatch_panics_total` (counter): chains that panicked
//! - `dispatch_request_duration_seconds` (histogram): dispatch latency
//! - `dispatch_chain_duration_seconds` (histogram): time spent in the
//!   remainder of the chain, measured by the time-cost middleware
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter only when enabled in config

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::pipeline::Outcome;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: Outcome, start: Instant) {
    let label = outcome.as_str();
    let status = status.to_string();
    metrics::counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "status" => status.clone(),
        "outcome" => label
    )
    .increment(1);
    metrics::histogram!(
        "dispatch_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status,
        "outcome" => label
    )
    .record(start.elapsed().as_secs_f64());

    match outcome {
        Outcome::TimedOut => metrics::counter!("dispatch_timeouts_total").increment(1),
        Outcome::Failed => metrics::counter!("dispatch_panics_total").increment(1),
        Outcome::Completed => {}
    }
}

/// Record time spent in the chain below a wrapping middleware.
pub fn record_chain_duration(elapsed: Duration) {
    metrics::histogram!("dispatch_chain_duration_seconds").record(elapsed.as_secs_f64());
}
