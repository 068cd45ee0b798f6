//! TCP listener with bounded accept waits.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections within a bounded wait so callers can
//!   re-check their running flag between attempts
//! - Optionally cap concurrent sessions via a semaphore
//!
//! Without a cap every accepted connection gets its own task and nothing
//! pushes back on clients. That is the default and a capacity risk under
//! connection floods; set `limits.max_sessions` to bound it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

/// A TCP listener whose accept call never blocks longer than a given wait.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    session_limit: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Bind to `host:port`. `max_sessions` of `None` means unbounded.
    pub async fn bind(
        host: &str,
        port: u16,
        max_sessions: Option<usize>,
    ) -> Result<Self, ListenerError> {
        let address = format!("{}:{}", host, port);
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                source,
            })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { address, source })?;

        match max_sessions {
            Some(max) => {
                tracing::info!(address = %local_addr, max_sessions = max, "Listener bound")
            }
            None => tracing::info!(address = %local_addr, "Listener bound (no session limit)"),
        }

        Ok(Self {
            inner: listener,
            session_limit: max_sessions.map(|max| Arc::new(Semaphore::new(max))),
        })
    }

    /// Accept one connection, waiting at most `wait`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. With a session cap the
    /// wait also covers acquiring a free slot; the returned permit holds that
    /// slot until dropped.
    pub async fn accept_within(
        &self,
        wait: Duration,
    ) -> Result<Option<(TcpStream, SocketAddr, ConnectionPermit)>, ListenerError> {
        let attempt = async {
            let permit = match &self.session_limit {
                // The semaphore is owned by this listener and never closed.
                Some(limit) => limit.clone().acquire_owned().await.ok(),
                None => None,
            };
            let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
            Ok::<_, ListenerError>((stream, addr, ConnectionPermit { _permit: permit }))
        };

        match tokio::time::timeout(wait, attempt).await {
            Ok(Ok(accepted)) => {
                tracing::debug!(
                    peer_addr = %accepted.1,
                    available_permits = ?self.available_permits(),
                    "Connection accepted"
                );
                Ok(Some(accepted))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Free session slots, or `None` when sessions are unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.session_limit.as_ref().map(|s| s.available_permits())
    }
}

/// A session slot. Released back to the listener when dropped, even if the
/// session task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_times_out_without_clients() {
        let listener = Listener::bind("127.0.0.1", 0, None).await.unwrap();
        let accepted = listener.accept_within(Duration::from_millis(50)).await.unwrap();
        assert!(accepted.is_none());
        assert_eq!(listener.available_permits(), None);
    }

    #[tokio::test]
    async fn session_cap_holds_slot_until_permit_dropped() {
        let listener = Listener::bind("127.0.0.1", 0, Some(1)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let _c2 = TcpStream::connect(addr).await.unwrap();

        let first = listener.accept_within(Duration::from_secs(1)).await.unwrap();
        assert!(first.is_some());
        assert_eq!(listener.available_permits(), Some(0));

        // Slot is taken: the second client waits in the backlog.
        let blocked = listener.accept_within(Duration::from_millis(100)).await.unwrap();
        assert!(blocked.is_none());

        drop(first);
        let second = listener.accept_within(Duration::from_secs(1)).await.unwrap();
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = Listener::bind("127.0.0.1", 0, None).await.unwrap();
        let port = first.local_addr().unwrap().port();
        let err = Listener::bind("127.0.0.1", port, None).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }
}
