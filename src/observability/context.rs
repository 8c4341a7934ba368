//! Request-scoped storage shared between the logging middleware and handlers.
//!
//! # Responsibilities
//! - Mint the correlation identifier for a request (UUID v4)
//! - Carry that identifier to handlers through request extensions
//! - Provide the error slot a handler uses to flag a simulated failure
//!
//! # Design Decisions
//! - One `RequestContext` per request, never a global
//! - The middleware keeps a clone, so a value written by a handler is
//!   visible once the handler chain returns

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};

use axum::http::HeaderValue;
use uuid::Uuid;

/// Response header carrying the correlation identifier.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation identifier for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier as a response header value.
    pub fn header_value(&self) -> HeaderValue {
        // Hyphenated UUIDs are plain ASCII.
        HeaderValue::from_str(&self.0).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type BoxError = Box<dyn Error + Send + Sync>;

struct ContextInner {
    request_id: RequestId,
    error: Mutex<Option<BoxError>>,
}

/// Per-request key/value context with two well-known slots.
///
/// Handlers receive it with `Extension<RequestContext>`.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl RequestContext {
    /// Create a context with a freshly generated request ID.
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request_id,
                error: Mutex::new(None),
            }),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.inner.request_id
    }

    /// Flag a failure for the request log. A later call replaces the earlier error.
    pub fn record_error<E>(&self, err: E)
    where
        E: Error + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.inner.error.lock() {
            *slot = Some(Box::new(err));
        }
    }

    /// Message of the recorded error, if a handler set one.
    pub fn extract_error(&self) -> Option<String> {
        self.inner
            .error
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|err| err.to_string()))
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.inner.request_id)
            .field("error", &self.extract_error())
            .finish()
    }
}
