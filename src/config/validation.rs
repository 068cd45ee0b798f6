//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports set and non-zero, weights positive, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: &ProxyConfig → Result<(), Vec<ValidationError>>
//! - Duplicate backend ids are allowed; `duplicate_ids` reports them for warnings

use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listening_port is not set")]
    MissingListeningPort,

    #[error("listening_port must be between 1 and 65535")]
    ZeroListeningPort,

    #[error("bind_host must not be empty")]
    EmptyBindHost,

    #[error("backend {id}: host must not be empty")]
    EmptyBackendHost { id: u32 },

    #[error("backend {id}: port must be between 1 and 65535")]
    ZeroBackendPort { id: u32 },

    #[error("backend {id}: weight must be a positive integer")]
    ZeroWeight { id: u32 },

    #[error("timeouts.{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("limits.max_sessions must be greater than zero when set")]
    ZeroMaxSessions,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.listening_port {
        None => errors.push(ValidationError::MissingListeningPort),
        Some(0) => errors.push(ValidationError::ZeroListeningPort),
        Some(_) => {}
    }

    if config.bind_host.trim().is_empty() {
        errors.push(ValidationError::EmptyBindHost);
    }

    for server in &config.backend_servers {
        if server.host.trim().is_empty() {
            errors.push(ValidationError::EmptyBackendHost { id: server.id });
        }
        if server.port == 0 {
            errors.push(ValidationError::ZeroBackendPort { id: server.id });
        }
        if server.weight == 0 {
            errors.push(ValidationError::ZeroWeight { id: server.id });
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "connect_secs",
        });
    }
    if config.timeouts.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "poll_interval_ms",
        });
    }

    if config.limits.max_sessions == Some(0) {
        errors.push(ValidationError::ZeroMaxSessions);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Backend ids that appear more than once, in ascending order.
pub fn duplicate_ids(config: &ProxyConfig) -> Vec<u32> {
    let mut seen: BTreeMap<u32, usize> = BTreeMap::new();
    for server in &config.backend_servers {
        *seen.entry(server.id).or_default() += 1;
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect()
}
