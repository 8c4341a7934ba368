//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → observability::request_log (capture + request record)
//!     → handlers.rs (health, echo, delay, error, random)
//!     → Send to client
//! ```

pub mod handlers;
pub mod server;

pub use handlers::{TestRequest, TestResponse};
pub use server::{HttpServer, ServerError};
