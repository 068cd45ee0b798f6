//! magiclb: a transparent TCP load balancer.
//!
//! Inbound connections are spread across backend servers chosen by a
//! round-robin or smooth weighted round-robin strategy, then relayed byte for
//! byte until either side closes.

pub mod config;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use lifecycle::Shutdown;
pub use load_balancer::{Algorithm, BackendServer, Protocol, SharedStrategy, Strategy};
pub use proxy::{ProxyServer, ProxyState};
