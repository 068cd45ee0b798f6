//! Proxy server: listening socket, accept loop, session spawning.
//!
//! # Responsibilities
//! - Bind and listen on `(host, port)`
//! - Accept with a bounded wait so `stop()` is observed promptly
//! - Spawn one independent task per accepted connection
//! - Track lifecycle state: Stopped → Starting → Running → Stopping → Stopped
//!
//! Sessions are not capped unless `max_sessions` is set. Unbounded is the
//! default; under a connection flood every connection gets a task and a
//! backend socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{ProxyConfig, TimeoutConfig};
use crate::lifecycle::Shutdown;
use crate::load_balancer::SharedStrategy;
use crate::net::{ConnectionPermit, Listener, SessionTracker};
use crate::proxy::error::ProxyError;
use crate::proxy::session::{self, SessionContext};

/// Lifecycle state of a [`ProxyServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// A transparent TCP reverse proxy.
#[derive(Debug)]
pub struct ProxyServer {
    host: String,
    port: u16,
    strategy: SharedStrategy,
    timeouts: TimeoutConfig,
    max_sessions: Option<usize>,
    state: watch::Sender<ProxyState>,
    shutdown: Mutex<Shutdown>,
    local_addr: Mutex<Option<SocketAddr>>,
    sessions: SessionTracker,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProxyServer {
    pub fn new(host: impl Into<String>, port: u16, strategy: SharedStrategy) -> Self {
        let (state, _) = watch::channel(ProxyState::Stopped);
        Self {
            host: host.into(),
            port,
            strategy,
            timeouts: TimeoutConfig::default(),
            max_sessions: None,
            state,
            shutdown: Mutex::new(Shutdown::new()),
            local_addr: Mutex::new(None),
            sessions: SessionTracker::new(),
        }
    }

    /// Build a server from a validated configuration.
    /// An unset listening port binds an ephemeral one.
    pub fn from_config(config: &ProxyConfig, strategy: SharedStrategy) -> Self {
        Self::new(
            config.bind_host.clone(),
            config.listening_port.unwrap_or(0),
            strategy,
        )
        .with_timeouts(config.timeouts.clone())
        .with_max_sessions(config.limits.max_sessions)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn strategy(&self) -> &SharedStrategy {
        &self.strategy
    }

    pub fn state(&self) -> ProxyState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ProxyState> {
        self.state.subscribe()
    }

    /// Address actually bound, available while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }

    /// Sessions currently in flight.
    pub fn active_sessions(&self) -> u64 {
        self.sessions.active_count()
    }

    fn is_running(&self) -> bool {
        self.state() == ProxyState::Running
    }

    /// Bind and run the accept loop until [`stop`](Self::stop) is called.
    ///
    /// Returns `AlreadyRunning` if the server is not stopped, or a listener
    /// error if the address cannot be bound. Can be called again once it
    /// has returned.
    pub async fn start(&self) -> Result<(), ProxyError> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == ProxyState::Stopped {
                *state = ProxyState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::warn!(state = ?self.state(), "Proxy server is already running");
            return Err(ProxyError::AlreadyRunning);
        }

        let shutdown = Shutdown::new();
        *lock(&self.shutdown) = shutdown.clone();

        let result = self.serve(&shutdown).await;
        if let Err(e) = &result {
            tracing::error!(
                host = %self.host,
                port = self.port,
                error = %e,
                "Failed to start proxy server"
            );
        }

        // Sessions still relaying end at their next wakeup.
        shutdown.trigger();
        *lock(&self.local_addr) = None;
        self.state.send_replace(ProxyState::Stopped);
        tracing::info!(active_sessions = self.active_sessions(), "Proxy server stopped");
        result
    }

    /// Run [`start`](Self::start) on a new task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<(), ProxyError>> {
        let server = Arc::clone(self);
        tokio::spawn(async move { server.start().await })
    }

    /// Ask a starting or running server to stop. Returns `false` if it was
    /// not running. The accept loop exits within one poll interval and the
    /// listening socket is closed; sessions end at their next wakeup.
    pub fn stop(&self) -> bool {
        let stopping = self.state.send_if_modified(|state| match state {
            ProxyState::Starting | ProxyState::Running => {
                *state = ProxyState::Stopping;
                true
            }
            _ => false,
        });

        if stopping {
            tracing::info!("Stopping proxy server");
            lock(&self.shutdown).trigger();
        } else {
            tracing::info!("Proxy server is not running");
        }
        stopping
    }

    async fn serve(&self, shutdown: &Shutdown) -> Result<(), ProxyError> {
        let listener = Listener::bind(&self.host, self.port, self.max_sessions).await?;
        *lock(&self.local_addr) = listener.local_addr().ok();

        let running = self.state.send_if_modified(|state| {
            if *state == ProxyState::Starting {
                *state = ProxyState::Running;
                true
            } else {
                false
            }
        });
        if !running {
            return Ok(());
        }

        tracing::info!(
            address = ?self.local_addr(),
            algorithm = %self.strategy.algorithm(),
            backends = self.strategy.len(),
            "Proxy server listening"
        );

        let poll_interval = self.timeouts.poll_interval();
        let mut signal = shutdown.subscribe();

        while self.is_running() {
            let accepted = tokio::select! {
                res = listener.accept_within(poll_interval) => res,
                _ = signal.recv() => break,
            };

            match accepted {
                Ok(Some((stream, peer, permit))) => {
                    self.spawn_session(stream, peer, permit, shutdown)
                }
                Ok(None) => continue,
                Err(e) => {
                    if self.is_running() {
                        tracing::error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }

        drop(listener);
        tracing::debug!("Listening socket closed");
        Ok(())
    }

    fn spawn_session(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        shutdown: &Shutdown,
    ) {
        tracing::debug!(peer = %peer, "Accepted connection");

        let ctx = SessionContext {
            strategy: self.strategy.clone(),
            connect_timeout: self.timeouts.connect(),
            idle_timeout: self.timeouts.idle(),
            shutdown: shutdown.subscribe(),
        };
        let guard = self.sessions.track();
        tokio::spawn(session::run(stream, peer, ctx, guard, permit));
    }
}
