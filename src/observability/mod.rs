//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → middleware.rs (request_log: one record per request)
//!         → context.rs (correlation ID, error slot)
//!         → capture.rs (request replay, response mirroring)
//!         → record.rs (severity, body decode, JSON line)
//!         → sink.rs (stdout)
//!
//! Process diagnostics:
//!     → logging.rs (tracing subscriber on stderr)
//! ```
//!
//! # Design Decisions
//! - Request records go to stdout, diagnostics to stderr
//! - Request ID flows through request extensions, response header and record
//! - Logging is best effort and never changes what the client receives

pub mod capture;
pub mod context;
pub mod logging;
pub mod middleware;
pub mod record;
pub mod sink;

pub use context::{RequestContext, RequestId, X_REQUEST_ID};
pub use middleware::{request_log, RequestLogger};
pub use record::{LogRecord, Severity};
pub use sink::{LogSink, MemorySink, StdoutSink};
