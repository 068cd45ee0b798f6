//! Round-robin load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{remove_first, BackendServer, LoadBalancer};

/// Round-robin selector.
/// Stores a cursor into the server list and advances it on every selection.
#[derive(Debug, Default)]
pub struct RoundRobin {
    servers: Vec<Arc<BackendServer>>,
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the server returned by the next selection.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl LoadBalancer for RoundRobin {
    fn add_server(&mut self, server: Arc<BackendServer>) {
        self.servers.push(server);
    }

    fn remove_server(&mut self, server: &BackendServer) -> bool {
        let removed = remove_first(&mut self.servers, server);
        // The cursor is only clamped, never shifted: removing an entry at or
        // before the cursor makes the next selection skip one server once.
        if self.cursor >= self.servers.len() {
            self.cursor = 0;
        }
        removed
    }

    fn next_server(&mut self) -> Option<Arc<BackendServer>> {
        if self.servers.is_empty() {
            return None;
        }

        let server = self.servers[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.servers.len();
        Some(server)
    }

    fn servers(&self) -> &[Arc<BackendServer>] {
        &self.servers
    }
}
