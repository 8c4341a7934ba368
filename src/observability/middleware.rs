//! Request/response logging middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → RequestContext::new (correlation ID, error slot)
//!     → replay_request_body (capture request bytes)
//!     → handler chain
//!     → elapsed, x-request-id header, severity, error slot
//!     → CaptureBody (mirror response bytes)
//!     → body exhausted → LogRecord → LogSink
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::observability::capture::{content_length, replay_request_body, CaptureBody};
use crate::observability::context::{RequestContext, X_REQUEST_ID};
use crate::observability::record::{decode_body, timestamp_now, LogRecord, Severity};
use crate::observability::sink::LogSink;

/// Shared state of the logging middleware.
#[derive(Clone)]
pub struct RequestLogger {
    service_name: Arc<str>,
    sink: Arc<dyn LogSink>,
}

impl RequestLogger {
    pub fn new(service_name: impl Into<Arc<str>>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            service_name: service_name.into(),
            sink,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Serialize and write a record. Failures are swallowed.
    pub fn emit(&self, record: &LogRecord) {
        let line = match record.to_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(
                    correlation_id = %record.correlation_id,
                    error = %e,
                    "Failed to serialize request record"
                );
                return;
            }
        };
        if let Err(e) = self.sink.write_line(&line) {
            tracing::debug!(
                correlation_id = %record.correlation_id,
                error = %e,
                "Failed to write request record"
            );
        }
    }
}

/// Everything known about a request once the handler chain has returned.
struct PendingRecord {
    logger: RequestLogger,
    correlation_id: String,
    url: String,
    http_method: String,
    status: StatusCode,
    elapsed_millis: u64,
    request_body: Option<Value>,
    error_message: Option<String>,
}

impl PendingRecord {
    fn finish(self, response_bytes: &[u8]) {
        let record = LogRecord {
            timestamp: timestamp_now(),
            severity: Severity::from_status(self.status.as_u16()),
            correlation_id: self.correlation_id,
            service_name: self.logger.service_name().to_string(),
            url: self.url,
            elapsed_millis: self.elapsed_millis,
            http_method: self.http_method,
            http_status_code: self.status.as_u16(),
            request_body: self.request_body,
            response_body: decode_body(response_bytes),
            error_message: self.error_message,
        };
        self.logger.emit(&record);
    }
}

/// Responses hyper never writes a body for, so the body may be dropped unread.
fn is_bodiless(method: &Method, status: StatusCode) -> bool {
    method == Method::HEAD
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || status.is_informational()
}

/// Middleware emitting one [`LogRecord`] per request.
pub async fn request_log(
    State(logger): State<RequestLogger>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::new();
    let start_time = Instant::now();
    let method = request.method().clone();
    let url = request.uri().to_string();

    let (mut request, request_bytes) = replay_request_body(request).await;
    request.extensions_mut().insert(ctx.clone());

    let response = next.run(request).await;
    let elapsed_millis = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (mut parts, body) = response.into_parts();
    parts.headers.insert(
        HeaderName::from_static(X_REQUEST_ID),
        ctx.request_id().header_value(),
    );

    let pending = PendingRecord {
        logger,
        correlation_id: ctx.request_id().to_string(),
        url,
        http_method: method.to_string(),
        status: parts.status,
        elapsed_millis,
        request_body: decode_body(&request_bytes),
        error_message: ctx.extract_error(),
    };

    if is_bodiless(&method, parts.status) {
        pending.finish(&[]);
        return Response::from_parts(parts, body);
    }

    let declared = content_length(&parts.headers);
    let body = CaptureBody::new(body, move |bytes| pending.finish(&bytes))
        .with_declared_length(declared);
    Response::from_parts(parts, Body::new(body))
}
