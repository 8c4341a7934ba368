//! Structured request log record.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// Log level of a request record.
///
/// Only `Info` and `Error` are derived from a status code. `Warn` and `Debug`
/// are part of the record format that log consumers parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Debug,
}

impl Severity {
    /// `Error` for any status of 400 or above, `Info` otherwise.
    pub fn from_status(status: u16) -> Self {
        if status >= 400 {
            Severity::Error
        } else {
            Severity::Info
        }
    }
}

/// One line of the request log.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub severity: Severity,
    pub correlation_id: String,
    pub service_name: String,
    pub url: String,
    pub elapsed_millis: u64,
    pub http_method: String,
    pub http_status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogRecord {
    /// Serialize to a single JSON line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current time in RFC 3339, UTC, second precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Best-effort JSON decode of a captured body.
///
/// Empty or malformed input yields `None`.
pub fn decode_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}
