//! Metrics collection and exposition.
//!
//! # Metrics
//! - `devgate_requests_total` (counter): requests by method, status
//! - `devgate_request_duration_seconds` (histogram): latency distribution
//! - `devgate_gate_decisions_total` (counter): gate outcomes by decision
//! - `devgate_upstream_errors_total` (counter): failed upstream calls

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    ::metrics::counter!(
        "devgate_requests_total",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    ::metrics::histogram!(
        "devgate_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one gate evaluation.
pub fn record_gate_decision(decision: &'static str) {
    ::metrics::counter!("devgate_gate_decisions_total", "decision" => decision).increment(1);
}

/// Record a failed upstream call.
pub fn record_upstream_error() {
    ::metrics::counter!("devgate_upstream_errors_total").increment(1);
}
