//! One-shot reachability check for a backend.
//!
//! Used for status reporting only. The result is never fed back into
//! selection: the strategies keep no health state.

use std::fmt;
use std::time::Duration;

use tokio::net::TcpStream;

/// Outcome of a single connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reachability::Reachable => f.write_str("Reachable"),
            Reachability::Unreachable => f.write_str("Unreachable"),
        }
    }
}

/// Try to open a TCP connection to `host:port` within `timeout`, then close it.
pub async fn check_reachable(host: &str, port: u16, timeout: Duration) -> Reachability {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => Reachability::Reachable,
        Ok(Err(e)) => {
            tracing::debug!(host, port, error = %e, "Backend connect failed");
            Reachability::Unreachable
        }
        Err(_) => {
            tracing::debug!(host, port, "Backend connect timed out");
            Reachability::Unreachable
        }
    }
}
