//! Bidirectional byte relay between a client and its backend.
//!
//! Each direction runs its own read/write loop over a split half, and both
//! loops are polled concurrently, so a write blocked on one side never stops
//! reads on the other. The relay ends on the first EOF or I/O error from
//! either side, when shutdown is signalled, or when the optional idle
//! deadline passes without traffic.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::lifecycle::shutdown::ShutdownSignal;

const BUFFER_SIZE: usize = 8 * 1024;

/// Why the relay stopped.
#[derive(Debug)]
pub enum RelayEnd {
    ClientClosed,
    BackendClosed,
    Shutdown,
    Idle,
    Failed(io::Error),
}

/// Result of a finished relay.
#[derive(Debug)]
pub struct RelayOutcome {
    pub end: RelayEnd,
    pub client_to_backend: u64,
    pub backend_to_client: u64,
}

/// Time of the last forwarded chunk, in milliseconds since the relay began.
struct Activity {
    started: Instant,
    last_ms: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.last_ms.store(elapsed, Ordering::Relaxed);
    }

    fn deadline(&self, timeout: Duration) -> Instant {
        self.started + Duration::from_millis(self.last_ms.load(Ordering::Relaxed)) + timeout
    }
}

/// Relay until either side closes. Both streams stay owned by the caller,
/// which releases them after this returns.
pub async fn relay<C, B>(
    client: &mut C,
    backend: &mut B,
    shutdown: &mut ShutdownSignal,
    idle_timeout: Option<Duration>,
) -> RelayOutcome
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let client_to_backend = AtomicU64::new(0);
    let backend_to_client = AtomicU64::new(0);
    let activity = Activity::new();
    let idle_after = idle_timeout.unwrap_or(Duration::ZERO);

    let end = if shutdown.is_triggered() {
        RelayEnd::Shutdown
    } else {
        let (mut client_read, mut client_write) = tokio::io::split(client);
        let (mut backend_read, mut backend_write) = tokio::io::split(backend);

        tokio::select! {
            res = pump(&mut client_read, &mut backend_write, &client_to_backend, &activity) => {
                match res {
                    Ok(()) => RelayEnd::ClientClosed,
                    Err(e) => RelayEnd::Failed(e),
                }
            }
            res = pump(&mut backend_read, &mut client_write, &backend_to_client, &activity) => {
                match res {
                    Ok(()) => RelayEnd::BackendClosed,
                    Err(e) => RelayEnd::Failed(e),
                }
            }
            _ = shutdown.recv() => RelayEnd::Shutdown,
            _ = idle(&activity, idle_after), if idle_timeout.is_some() => RelayEnd::Idle,
        }
    };

    RelayOutcome {
        end,
        client_to_backend: client_to_backend.into_inner(),
        backend_to_client: backend_to_client.into_inner(),
    }
}

/// Forward everything read from `reader` to `writer` until EOF.
async fn pump<R, W>(
    reader: &mut R,
    writer: &mut W,
    forwarded: &AtomicU64,
    activity: &Activity,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        forwarded.fetch_add(n as u64, Ordering::Relaxed);
        activity.touch();
    }
}

/// Resolve once `timeout` has passed since the last forwarded chunk.
async fn idle(activity: &Activity, timeout: Duration) {
    loop {
        let deadline = activity.deadline(timeout);
        if Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep_until(deadline).await;
    }
}
