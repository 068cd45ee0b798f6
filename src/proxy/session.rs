//! One proxied client connection.
//!
//! # State Machine
//! ```text
//! Connecting ──select + connect──▶ Relaying ──EOF/error/shutdown──▶ Closed
//!     │
//!     └── no backend / refused / timeout / internal → fixed response → Closed
//! ```
//!
//! Both sockets are owned by this module and dropped on every exit path.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::load_balancer::{BackendServer, SharedStrategy};
use crate::net::{ConnectionPermit, SessionGuard, SessionState};
use crate::observability::metrics;
use crate::proxy::error::SessionError;
use crate::proxy::relay::{relay, RelayEnd, RelayOutcome};

/// Everything a session needs from its server.
#[derive(Debug)]
pub(crate) struct SessionContext {
    pub strategy: SharedStrategy,
    pub connect_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub shutdown: ShutdownSignal,
}

/// Run a session to completion. Never fails: errors are answered on the
/// client connection where possible, then logged.
pub(crate) async fn run(
    client: TcpStream,
    peer: SocketAddr,
    ctx: SessionContext,
    guard: SessionGuard,
    permit: ConnectionPermit,
) {
    let span = tracing::info_span!("session", id = %guard.id(), peer = %peer);
    async move {
        metrics::record_session_started();
        handle(client, ctx).await;
        metrics::record_session_finished();
        drop(permit);
        drop(guard);
    }
    .instrument(span)
    .await
}

async fn handle(mut client: TcpStream, mut ctx: SessionContext) {
    tracing::trace!(state = ?SessionState::Connecting, "Session started");

    match proxy(&mut client, &mut ctx).await {
        Ok(outcome) => {
            metrics::record_relayed_bytes(outcome.client_to_backend, outcome.backend_to_client);
            match outcome.end {
                RelayEnd::Failed(e) => {
                    let err = SessionError::Relay(e);
                    metrics::record_session_error(err.kind());
                    tracing::warn!(error = %err, "Session ended");
                }
                end => tracing::debug!(
                    reason = ?end,
                    client_to_backend = outcome.client_to_backend,
                    backend_to_client = outcome.backend_to_client,
                    "Session ended"
                ),
            }
        }
        Err(err) => {
            metrics::record_session_error(err.kind());
            match &err {
                SessionError::NoBackends | SessionError::NoSelection => {
                    tracing::warn!(error = %err, "No backend available")
                }
                _ => tracing::error!(error = %err, "Backend connection failed"),
            }
            if let Some(response) = err.response() {
                if let Err(e) = client.write_all(response).await {
                    tracing::debug!(error = %e, "Failed to write error response");
                }
            }
        }
    }

    let _ = client.shutdown().await;
    tracing::trace!(state = ?SessionState::Closed, "Session closed");
}

/// Select a backend, connect, and relay. The backend stream lives only in
/// this frame, so it is closed however the relay ends.
async fn proxy(
    client: &mut TcpStream,
    ctx: &mut SessionContext,
) -> Result<RelayOutcome, SessionError> {
    if !ctx.strategy.has_servers() {
        return Err(SessionError::NoBackends);
    }

    let server = ctx.strategy.get_next_server().ok_or(SessionError::NoSelection)?;
    metrics::record_backend_selected(&server);
    tracing::debug!(backend = %server, "Routing to backend");

    let mut backend = connect(&server, ctx.connect_timeout).await?;

    tracing::trace!(state = ?SessionState::Relaying, backend = %server.address(), "Relaying");
    Ok(relay(client, &mut backend, &mut ctx.shutdown, ctx.idle_timeout).await)
}

async fn connect(
    server: &Arc<BackendServer>,
    timeout: Duration,
) -> Result<TcpStream, SessionError> {
    let address = server.address();
    let attempt = TcpStream::connect((server.host.as_str(), server.port));
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(SessionError::from_connect(address, e)),
        Err(_) => Err(SessionError::BackendTimeout { address }),
    }
}
