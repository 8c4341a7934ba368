//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (ServerConfig::default)
//!     → loader.rs (optional TOML file)
//!     → loader.rs (SERVICE_NAME / PORT overrides)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never changes afterwards
//! - All fields have defaults to allow running with no file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, ServerConfig, ServiceConfig, SimulationConfig,
    TimeoutConfig, DEFAULT_SERVICE_NAME,
};
pub use validation::ValidationError;
