//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bounded accept wait, optional session cap)
//!     → connection.rs (session id, live-session tracking)
//!     → Hand off to the proxy session
//!
//! Status reporting:
//!     → reachability.rs (one-shot connect per backend, no state kept)
//! ```
//!
//! # Design Decisions
//! - Accept never blocks past one poll interval so stop() is observed promptly
//! - Each session tracked for shutdown reporting

pub mod connection;
pub mod listener;
pub mod reachability;

pub use connection::{SessionGuard, SessionId, SessionState, SessionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use reachability::{check_reachable, Reachability};
