//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated)
//!     → seeds the strategy and the ProxyServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no hot reload
//! - All fields except `listening_port` have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, save_config, ConfigError, ConfigFormat};
pub use schema::{LimitsConfig, LogFormat, ObservabilityConfig, ProxyConfig, TimeoutConfig};
pub use validation::{duplicate_ids, validate_config, ValidationError};
