//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Accept loop and sessions produce:
//!     → logging.rs (structured tracing events, one span per session)
//!     → metrics.rs (session counters, selections, relayed bytes)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
