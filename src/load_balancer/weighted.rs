//! Smooth weighted round-robin load balancing strategy.
//!
//! Nginx-style interleaving: a threshold starts at the maximum weight and is
//! lowered by the gcd of all weights each time the cursor wraps to the first
//! server. A server is picked when its weight reaches the current threshold,
//! so heavier servers are picked more often without being picked in bursts.
//!
//! Weights `[3, 1]` produce `s1, s1, s2, s1, s1, s1, s2, ...`.

use std::sync::Arc;

use crate::load_balancer::{remove_first, BackendServer, LoadBalancer};

/// Smooth weighted round-robin selector.
#[derive(Debug)]
pub struct SmoothWeightedRoundRobin {
    servers: Vec<Arc<BackendServer>>,
    max_weight: u32,
    gcd_weight: u32,
    /// Index of the last inspected server; -1 before the first selection.
    server_cursor: isize,
    /// Minimum weight a server needs to be picked; -1 while empty.
    weight_threshold: i64,
}

impl Default for SmoothWeightedRoundRobin {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            max_weight: 0,
            gcd_weight: 0,
            server_cursor: -1,
            weight_threshold: -1,
        }
    }
}

impl SmoothWeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_weight(&self) -> u32 {
        self.max_weight
    }

    pub fn gcd_weight(&self) -> u32 {
        self.gcd_weight
    }

    fn recalculate(&mut self) {
        self.max_weight = self.servers.iter().map(|s| s.weight).max().unwrap_or(0);
        self.gcd_weight = self.servers.iter().map(|s| s.weight).fold(0, gcd);

        if self.servers.is_empty() {
            self.server_cursor = -1;
            self.weight_threshold = -1;
        } else {
            self.server_cursor = -1;
            self.weight_threshold = i64::from(self.max_weight);
        }
    }
}

impl LoadBalancer for SmoothWeightedRoundRobin {
    fn add_server(&mut self, server: Arc<BackendServer>) {
        self.servers.push(server);
        self.recalculate();
    }

    fn remove_server(&mut self, server: &BackendServer) -> bool {
        let removed = remove_first(&mut self.servers, server);
        self.recalculate();
        removed
    }

    fn next_server(&mut self) -> Option<Arc<BackendServer>> {
        if self.servers.is_empty() {
            return None;
        }

        let len = self.servers.len() as isize;
        let gcd_weight = i64::from(self.gcd_weight);
        let max_weight = i64::from(self.max_weight);

        // Terminates: the threshold drops by gcd on every wrap and is reset to
        // max_weight, which the heaviest server always satisfies.
        loop {
            self.server_cursor = (self.server_cursor + 1) % len;
            if self.server_cursor == 0 {
                self.weight_threshold -= gcd_weight;
                if self.weight_threshold <= 0 {
                    self.weight_threshold = max_weight;
                }
            }

            let server = &self.servers[self.server_cursor as usize];
            if i64::from(server.weight) >= self.weight_threshold {
                return Some(server.clone());
            }
        }
    }

    fn servers(&self) -> &[Arc<BackendServer>] {
        &self.servers
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}
