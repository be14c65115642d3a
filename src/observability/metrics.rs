//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, connections, queue depth)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `httpd_requests_total` (counter): requests by method, status, handler
//! - `httpd_request_duration_seconds` (histogram): latency distribution
//! - `httpd_connections_accepted_total` / `httpd_connections_closed_total` (counters)
//! - `httpd_held_connections` (gauge): idle connections watched by the acceptor
//! - `httpd_queue_depth` (gauge): connections waiting for a worker
//! - `httpd_cgi_spawn_failures_total` (counter)
//! - `httpd_uploads_saved_total` (counter)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The exporter runs its own scrape listener, separate from the server

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and start its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, handler: &'static str, start: Instant) {
    metrics::counter!(
        "httpd_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "handler" => handler
    )
    .increment(1);
    metrics::histogram!("httpd_request_duration_seconds", "handler" => handler)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_connection_accepted() {
    metrics::counter!("httpd_connections_accepted_total").increment(1);
}

pub fn record_connection_closed() {
    metrics::counter!("httpd_connections_closed_total").increment(1);
}

pub fn set_held_connections(count: usize) {
    metrics::gauge!("httpd_held_connections").set(count as f64);
}

pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("httpd_queue_depth").set(depth as f64);
}

pub fn record_cgi_spawn_failure() {
    metrics::counter!("httpd_cgi_spawn_failures_total").increment(1);
}

pub fn record_upload_saved() {
    metrics::counter!("httpd_uploads_saved_total").increment(1);
}
