//! Backend server description.
//!
//! # Responsibilities
//! - Represent a single backend endpoint (host, port, protocol label, weight)
//! - Structural equality over every field
//! - Human-readable display form used by the CLI and logs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Protocol label attached to a backend.
///
/// Informational only: the proxy relays bytes the same way for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown protocol label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol '{0}' (expected http, https or tcp)")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "tcp" => Ok(Protocol::Tcp),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

/// A single backend server.
///
/// Ids are assigned by the caller and are not required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BackendServer {
    /// Caller-assigned identifier.
    pub id: u32,
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Protocol label.
    #[serde(default)]
    pub protocol: Protocol,
    /// Weight for weighted round robin (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl BackendServer {
    /// Create a backend with the default protocol (`http`) and weight 1.
    pub fn new(id: u32, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
            protocol: Protocol::default(),
            weight: default_weight(),
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// `host:port`, suitable for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for BackendServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Server(ID: {}, Protocol: {}, Host: {}, Port: {}, Weight: {})",
            self.id,
            self.protocol.as_str().to_ascii_uppercase(),
            self.host,
            self.port,
            self.weight
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uppercases_protocol() {
        let server = BackendServer::new(1, "192.168.1.1", 9000)
            .with_protocol(Protocol::Tcp)
            .with_weight(5);
        assert_eq!(
            server.to_string(),
            "Server(ID: 1, Protocol: TCP, Host: 192.168.1.1, Port: 9000, Weight: 5)"
        );
    }

    #[test]
    fn defaults() {
        let server = BackendServer::new(7, "localhost", 8000);
        assert_eq!(server.protocol, Protocol::Http);
        assert_eq!(server.weight, 1);
        assert_eq!(server.address(), "localhost:8000");
    }

    #[test]
    fn equality_is_structural() {
        let a = BackendServer::new(1, "127.0.0.1", 8001);
        let b = BackendServer::new(1, "127.0.0.1", 8001);
        assert_eq!(a, b);

        assert_ne!(a, BackendServer::new(2, "127.0.0.1", 8001));
        assert_ne!(a, BackendServer::new(1, "127.0.0.2", 8001));
        assert_ne!(a, BackendServer::new(1, "127.0.0.1", 8002));
        assert_ne!(a, b.clone().with_protocol(Protocol::Https));
        assert_ne!(a, b.with_weight(2));
    }

    #[test]
    fn protocol_parsing() {
        assert_eq!("HTTPS".parse::<Protocol>().unwrap(), Protocol::Https);
        assert_eq!(" tcp ".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert!("udp".parse::<Protocol>().is_err());
    }
}
