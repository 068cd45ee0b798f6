//! Metrics collection and exposition.
//!
//! # Metrics
//! - `magiclb_sessions_total` (counter): accepted sessions
//! - `magiclb_active_sessions` (gauge): sessions in flight
//! - `magiclb_session_errors_total` (counter): failed sessions by kind
//! - `magiclb_backend_selections_total` (counter): selections by backend id
//! - `magiclb_relayed_bytes_total` (counter): bytes forwarded by direction
//!
//! Recording is a no-op until a recorder is installed, so the library can be
//! embedded without the exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::load_balancer::BackendServer;

/// Install the Prometheus recorder and serve it on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_session_started() {
    metrics::counter!("magiclb_sessions_total").increment(1);
    metrics::gauge!("magiclb_active_sessions").increment(1.0);
}

pub fn record_session_finished() {
    metrics::gauge!("magiclb_active_sessions").decrement(1.0);
}

pub fn record_session_error(kind: &'static str) {
    metrics::counter!("magiclb_session_errors_total", "kind" => kind).increment(1);
}

pub fn record_backend_selected(server: &BackendServer) {
    metrics::counter!("magiclb_backend_selections_total", "backend" => server.id.to_string())
        .increment(1);
}

pub fn record_relayed_bytes(client_to_backend: u64, backend_to_client: u64) {
    metrics::counter!("magiclb_relayed_bytes_total", "direction" => "client_to_backend")
        .increment(client_to_backend);
    metrics::counter!("magiclb_relayed_bytes_total", "direction" => "backend_to_client")
        .increment(backend_to_client);
}
