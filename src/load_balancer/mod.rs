//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Caller builds BackendServer entries
//!     → strategy.rs (SharedStrategy: one lock around every transition)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through servers in insertion order)
//!         - weighted.rs (smooth weighted round robin, gcd/max-weight threshold)
//!     → Return the next BackendServer or None
//! ```
//!
//! # Design Decisions
//! - Algorithms are plain state machines over `&mut self`; synchronization
//!   lives in `SharedStrategy`, not in each algorithm
//! - Insertion order defines rotation order
//! - No health state: a backend that just failed stays eligible

pub mod backend;
pub mod round_robin;
pub mod strategy;
pub mod weighted;

use std::sync::Arc;

pub use backend::{BackendServer, Protocol};
pub use round_robin::RoundRobin;
pub use strategy::{Algorithm, SharedStrategy, Strategy};
pub use weighted::SmoothWeightedRoundRobin;

/// A backend selection algorithm.
pub trait LoadBalancer: Send + std::fmt::Debug {
    /// Append a server to the rotation.
    fn add_server(&mut self, server: Arc<BackendServer>);

    /// Remove the first server structurally equal to `server`.
    /// Returns `true` if an entry was removed.
    fn remove_server(&mut self, server: &BackendServer) -> bool;

    /// Select the next server, or `None` when no servers are registered.
    fn next_server(&mut self) -> Option<Arc<BackendServer>>;

    /// Registered servers in rotation order.
    fn servers(&self) -> &[Arc<BackendServer>];

    fn len(&self) -> usize {
        self.servers().len()
    }

    fn is_empty(&self) -> bool {
        self.servers().is_empty()
    }
}

/// Remove the first entry equal to `server`, preserving order.
pub(crate) fn remove_first(servers: &mut Vec<Arc<BackendServer>>, server: &BackendServer) -> bool {
    match servers.iter().position(|s| s.as_ref() == server) {
        Some(index) => {
            servers.remove(index);
            true
        }
        None => false,
    }
}
