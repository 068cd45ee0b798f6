//! Proxy engine.
//!
//! # Data Flow
//! ```text
//! server.rs (accept loop, bounded wait)
//!     → session.rs (one task per connection)
//!         → SharedStrategy::get_next_server()
//!         → connect to backend (bounded)
//!         → relay.rs (bytes in both directions until EOF/error/shutdown)
//!         → on failure: response.rs bytes chosen by error.rs
//! ```
//!
//! # Design Decisions
//! - Protocol-agnostic: bytes are never inspected
//! - One selection and one connect attempt per session, no retries
//! - Failures stay inside the session; the accept loop and the strategy
//!   are never affected

pub mod error;
pub mod relay;
pub mod response;
pub mod server;
mod session;

pub use error::{ProxyError, SessionError};
pub use server::{ProxyServer, ProxyState};
