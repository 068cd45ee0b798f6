//! Configuration schema definitions.
//!
//! The top-level shape (`listening_port`, `backend_servers`) is the one the
//! management tooling persists. Every other section is optional and falls
//! back to defaults, so a file holding only those two keys is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::load_balancer::{Algorithm, BackendServer};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Port the proxy listens on. Unset until configured.
    pub listening_port: Option<u16>,

    /// Interface to bind (default: all interfaces).
    pub bind_host: String,

    /// Backend servers in rotation order.
    pub backend_servers: Vec<BackendServer>,

    /// Selection algorithm.
    pub algorithm: Algorithm,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Resource limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listening_port: None,
            bind_host: "0.0.0.0".to_string(),
            backend_servers: Vec::new(),
            algorithm: Algorithm::default(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Timeout configuration for session handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upper bound on each accept wait, in milliseconds. Also bounds how long
    /// stop() takes to be observed by the accept loop.
    pub poll_interval_ms: u64,

    /// Close a session after this many seconds without traffic (0 = never).
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            poll_interval_ms: 1000,
            idle_secs: 0,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle(&self) -> Option<Duration> {
        (self.idle_secs > 0).then(|| Duration::from_secs(self.idle_secs))
    }
}

/// Resource limits.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum concurrent sessions. Unset means unbounded.
    pub max_sessions: Option<usize>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::Protocol;

    #[test]
    fn minimal_json_fills_defaults() {
        let json = r#"{
            "listening_port": 8080,
            "backend_servers": [
                {"id": 1, "host": "127.0.0.1", "port": 8001},
                {"id": 2, "host": "127.0.0.1", "port": 8002, "protocol": "tcp", "weight": 3}
            ]
        }"#;

        let config: ProxyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.listening_port, Some(8080));
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.algorithm, Algorithm::RoundRobin);
        assert_eq!(config.backend_servers[0], BackendServer::new(1, "127.0.0.1", 8001));
        assert_eq!(
            config.backend_servers[1],
            BackendServer::new(2, "127.0.0.1", 8002)
                .with_protocol(Protocol::Tcp)
                .with_weight(3)
        );
        assert_eq!(config.timeouts.connect(), Duration::from_secs(5));
        assert_eq!(config.timeouts.idle(), None);
        assert_eq!(config.limits.max_sessions, None);
    }

    #[test]
    fn toml_sections() {
        let toml = r#"
            listening_port = 9000
            algorithm = "weighted_round_robin"

            [[backend_servers]]
            id = 1
            host = "10.0.0.1"
            port = 80
            weight = 2

            [timeouts]
            idle_secs = 30

            [observability]
            log_format = "json"
        "#;

        let config: ProxyConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.algorithm, Algorithm::WeightedRoundRobin);
        assert_eq!(config.backend_servers[0].weight, 2);
        assert_eq!(config.timeouts.idle(), Some(Duration::from_secs(30)));
        assert_eq!(config.timeouts.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let json = r#"{"backend_servers": [{"id": 1, "host": "h", "port": 70000}]}"#;
        assert!(serde_json::from_str::<ProxyConfig>(json).is_err());
    }
}
