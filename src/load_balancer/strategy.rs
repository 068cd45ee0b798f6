//! Strategy selection and the shared, serialized strategy handle.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::load_balancer::{
    BackendServer, LoadBalancer, RoundRobin, SmoothWeightedRoundRobin,
};

/// Available load balancing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::RoundRobin => f.write_str("round-robin"),
            Algorithm::WeightedRoundRobin => f.write_str("weighted-round-robin"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "round-robin" | "rr" => Ok(Algorithm::RoundRobin),
            "weighted-round-robin" | "wrr" | "weighted" => Ok(Algorithm::WeightedRoundRobin),
            other => Err(format!("unknown algorithm '{}'", other)),
        }
    }
}

/// The closed set of strategies, fixed at construction time.
#[derive(Debug)]
pub enum Strategy {
    RoundRobin(RoundRobin),
    SmoothWeighted(SmoothWeightedRoundRobin),
}

impl Strategy {
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::RoundRobin => Strategy::RoundRobin(RoundRobin::new()),
            Algorithm::WeightedRoundRobin => {
                Strategy::SmoothWeighted(SmoothWeightedRoundRobin::new())
            }
        }
    }

    /// Build a strategy seeded with `servers` in order.
    pub fn with_servers<I>(algorithm: Algorithm, servers: I) -> Self
    where
        I: IntoIterator<Item = BackendServer>,
    {
        let mut strategy = Self::new(algorithm);
        for server in servers {
            strategy.add_server(Arc::new(server));
        }
        strategy
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Strategy::RoundRobin(_) => Algorithm::RoundRobin,
            Strategy::SmoothWeighted(_) => Algorithm::WeightedRoundRobin,
        }
    }

    fn inner(&self) -> &dyn LoadBalancer {
        match self {
            Strategy::RoundRobin(lb) => lb,
            Strategy::SmoothWeighted(lb) => lb,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn LoadBalancer {
        match self {
            Strategy::RoundRobin(lb) => lb,
            Strategy::SmoothWeighted(lb) => lb,
        }
    }
}

impl LoadBalancer for Strategy {
    fn add_server(&mut self, server: Arc<BackendServer>) {
        self.inner_mut().add_server(server)
    }

    fn remove_server(&mut self, server: &BackendServer) -> bool {
        self.inner_mut().remove_server(server)
    }

    fn next_server(&mut self) -> Option<Arc<BackendServer>> {
        self.inner_mut().next_server()
    }

    fn servers(&self) -> &[Arc<BackendServer>] {
        self.inner().servers()
    }
}

/// Thread-safe handle to a strategy.
///
/// Every add/remove/select runs under one mutex, so concurrent sessions never
/// observe the same cursor position twice. The lock is held only for the
/// selection itself, never across I/O.
#[derive(Debug, Clone)]
pub struct SharedStrategy {
    inner: Arc<Mutex<Strategy>>,
}

impl SharedStrategy {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(strategy)),
        }
    }

    pub fn from_algorithm(algorithm: Algorithm) -> Self {
        Self::new(Strategy::new(algorithm))
    }

    fn lock(&self) -> MutexGuard<'_, Strategy> {
        // Every transition leaves the strategy consistent, so a panic while
        // holding the lock cannot corrupt it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_server(&self, server: BackendServer) {
        let mut strategy = self.lock();
        tracing::debug!(server = %server, "Adding backend server");
        strategy.add_server(Arc::new(server));
    }

    pub fn remove_server(&self, server: &BackendServer) -> bool {
        let removed = self.lock().remove_server(server);
        if removed {
            tracing::debug!(server = %server, "Removed backend server");
        } else {
            tracing::debug!(server = %server, "Backend server not registered, nothing removed");
        }
        removed
    }

    pub fn get_next_server(&self) -> Option<Arc<BackendServer>> {
        self.lock().next_server()
    }

    pub fn has_servers(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_servers()
    }

    /// Snapshot of the registered servers in rotation order.
    pub fn servers(&self) -> Vec<Arc<BackendServer>> {
        self.lock().servers().to_vec()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.lock().algorithm()
    }
}

impl From<Strategy> for SharedStrategy {
    fn from(strategy: Strategy) -> Self {
        Self::new(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;

    #[test]
    fn algorithm_parsing() {
        assert_eq!("round_robin".parse::<Algorithm>().unwrap(), Algorithm::RoundRobin);
        assert_eq!(
            "Weighted-Round-Robin".parse::<Algorithm>().unwrap(),
            Algorithm::WeightedRoundRobin
        );
        assert!("least-conn".parse::<Algorithm>().is_err());
    }

    #[test]
    fn strategy_dispatches_to_variant() {
        let servers = vec![
            BackendServer::new(1, "127.0.0.1", 8001).with_weight(3),
            BackendServer::new(2, "127.0.0.1", 8002).with_weight(1),
        ];

        let mut rr = Strategy::with_servers(Algorithm::RoundRobin, servers.clone());
        let picks: Vec<u32> = (0..4).filter_map(|_| rr.next_server()).map(|s| s.id).collect();
        assert_eq!(picks, vec![1, 2, 1, 2]);

        let mut wrr = Strategy::with_servers(Algorithm::WeightedRoundRobin, servers);
        assert_eq!(wrr.algorithm(), Algorithm::WeightedRoundRobin);
        let picks: Vec<u32> = (0..4).filter_map(|_| wrr.next_server()).map(|s| s.id).collect();
        assert_eq!(picks, vec![1, 1, 2, 1]);
    }

    #[test]
    fn shared_empty_returns_none() {
        for algorithm in [Algorithm::RoundRobin, Algorithm::WeightedRoundRobin] {
            let shared = SharedStrategy::from_algorithm(algorithm);
            assert!(shared.is_empty());
            assert_eq!(shared.get_next_server(), None);
        }
    }

    #[test]
    fn concurrent_selection_hits_each_slot_once_per_rotation() {
        const SERVERS: u32 = 4;
        const THREADS: usize = 8;
        const CALLS_PER_THREAD: usize = 500;

        let shared = SharedStrategy::from_algorithm(Algorithm::RoundRobin);
        for id in 0..SERVERS {
            shared.add_server(BackendServer::new(id, "127.0.0.1", 9000 + id as u16));
        }

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    (0..CALLS_PER_THREAD)
                        .map(|_| shared.get_next_server().unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<u32, usize> = HashMap::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                *counts.entry(id).or_default() += 1;
            }
        }

        let total = THREADS * CALLS_PER_THREAD;
        for id in 0..SERVERS {
            assert_eq!(counts[&id], total / SERVERS as usize);
        }
    }
}
