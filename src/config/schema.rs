//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "devops-prac-server";

/// Root configuration for the test server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Service identity stamped on every request record.
    pub service: ServiceConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Behaviour of the simulated test endpoints.
    pub simulation: SimulationConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Value of `service_name` in request records.
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for the handler chain) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Diagnostic log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Simulated latency and failure injection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Upper bound (exclusive) of the `/test/delay` sleep in milliseconds.
    pub delay_max_ms: u64,

    /// Upper bound (exclusive) of the `/test/random` sleep in milliseconds.
    pub random_delay_max_ms: u64,

    /// Probability that `/test/error` fails.
    pub error_probability: f64,

    /// Probability that `/test/random` fails.
    pub random_error_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            delay_max_ms: 2000,
            random_delay_max_ms: 3000,
            error_probability: 0.5,
            random_error_probability: 0.3,
        }
    }
}

impl SimulationConfig {
    /// No sleeps and fixed outcomes, for tests.
    pub fn deterministic(fail: bool) -> Self {
        let p = if fail { 1.0 } else { 0.0 };
        Self {
            delay_max_ms: 0,
            random_delay_max_ms: 0,
            error_probability: p,
            random_error_probability: p,
        }
    }
}
