//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_webhook_requests_total` (counter): webhook calls by outcome
//! - `relay_webhook_duration_seconds` (histogram): webhook handling latency
//! - `relay_gateway_sends_total` (counter): outbound sends by outcome
//! - `relay_trace_exports_total` (counter): ingestion batches by outcome
//! - `relay_trace_events_total` (counter): events shipped by outcome
//! - `relay_trace_events_dropped_total` (counter): events dropped on a full queue
//!
//! Recording without an installed recorder is a no-op, so tests never need one.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_webhook(outcome: &'static str, start: Instant) {
    counter!("relay_webhook_requests_total", "outcome" => outcome).increment(1);
    histogram!("relay_webhook_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_gateway_send(outcome: &'static str) {
    counter!("relay_gateway_sends_total", "outcome" => outcome).increment(1);
}

pub fn record_trace_export(outcome: &'static str, events: usize) {
    counter!("relay_trace_exports_total", "outcome" => outcome).increment(1);
    counter!("relay_trace_events_total", "outcome" => outcome).increment(events as u64);
}

pub fn record_trace_dropped() {
    counter!("relay_trace_events_dropped_total").increment(1);
}
