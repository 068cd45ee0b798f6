//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     stop() / signal → trigger → accept loop exits → sessions observe it
//!     at their next wakeup and release both connections
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls ProxyServer::stop()
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
