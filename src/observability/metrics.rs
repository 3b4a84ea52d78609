//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (probes, latency, target health, API requests)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `status_probes_total` (counter): probes by target, result
//! - `status_probe_latency_seconds` (histogram): probe latency by target
//! - `status_target_health` (gauge): 1=healthy, 0=unhealthy, -1=unknown
//! - `status_http_requests_total` (counter): API requests by route, status
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Exporter runs on its own address, separate from the API

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use crate::health::state::HealthStatus;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_probe(target: &str, result: &'static str, latency_ms: u64) {
    ::metrics::counter!(
        "status_probes_total",
        "target" => target.to_string(),
        "result" => result
    )
    .increment(1);
    ::metrics::histogram!("status_probe_latency_seconds", "target" => target.to_string())
        .record(latency_ms as f64 / 1_000.0);
}

pub fn record_target_health(target: &str, status: HealthStatus) {
    let value = match status {
        HealthStatus::Healthy => 1.0,
        HealthStatus::Unhealthy => 0.0,
        HealthStatus::Unknown => -1.0,
    };
    ::metrics::gauge!("status_target_health", "target" => target.to_string()).set(value);
}

pub fn record_request(route: &str, status: u16) {
    ::metrics::counter!(
        "status_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
