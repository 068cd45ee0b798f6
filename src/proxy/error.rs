//! Proxy and session error types.

use std::io;

use crate::net::ListenerError;
use crate::proxy::response;

/// Errors returned by `ProxyServer::start`.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("proxy server is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Why a session ended before or during relaying.
///
/// Every variant is terminal for its session and nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The strategy has no registered backends.
    #[error("no backend servers registered")]
    NoBackends,

    /// The strategy returned no server.
    #[error("load balancer returned no server")]
    NoSelection,

    #[error("backend {address} refused connection")]
    BackendRefused {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("connection to backend {address} timed out")]
    BackendTimeout { address: String },

    /// Anything else that went wrong before relaying began.
    #[error("internal error connecting to {address}: {source}")]
    Internal {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Transport failure once bytes were flowing. No response is possible.
    #[error("transport error during relay: {0}")]
    Relay(#[source] io::Error),
}

impl SessionError {
    /// Classify a failed backend connect attempt.
    pub fn from_connect(address: String, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::ConnectionRefused => SessionError::BackendRefused { address, source },
            io::ErrorKind::TimedOut => SessionError::BackendTimeout { address },
            _ => SessionError::Internal { address, source },
        }
    }

    /// Bytes to write to the client before closing, if any.
    pub fn response(&self) -> Option<&'static [u8]> {
        match self {
            SessionError::NoBackends => Some(response::NO_BACKENDS),
            SessionError::NoSelection => Some(response::NO_SELECTION),
            SessionError::BackendRefused { .. } => Some(response::BACKEND_REFUSED),
            SessionError::BackendTimeout { .. } => Some(response::GATEWAY_TIMEOUT),
            SessionError::Internal { .. } => Some(response::INTERNAL_ERROR),
            SessionError::Relay(_) => None,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NoBackends | SessionError::NoSelection => "no_backend",
            SessionError::BackendRefused { .. } => "backend_refused",
            SessionError::BackendTimeout { .. } => "backend_timeout",
            SessionError::Internal { .. } => "internal",
            SessionError::Relay(_) => "relay",
        }
    }
}
