//! Passive capture of request and response bodies.
//!
//! # Responsibilities
//! - Read a declared request body into memory and hand the handler chain a
//!   fresh body over the same bytes
//! - Mirror every response data frame into a buffer while forwarding it
//!   unchanged to the client
//!
//! # Design Decisions
//! - Capture never fails a request: a read error leaves the captured bytes
//!   empty and is handed on to the handler as the body's error
//! - `CaptureBody` is a decorator over `http_body::Body`, so it is a drop-in
//!   replacement for the handler's body (size hint and end-of-stream pass through)
//! - The completion hook fires once, when the inner body was exhausted or
//!   every byte of an exact size hint has been forwarded. A body dropped
//!   mid-stream (client went away) fires nothing.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Request};
use http_body::{Body as HttpBody, Frame, SizeHint};

/// `Content-Length` of a header map, if present and parsable.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Content length declared by the request headers, 0 when missing or unparsable.
pub fn declared_length(headers: &HeaderMap) -> u64 {
    content_length(headers).unwrap_or(0)
}

/// Read the request body into memory and re-install it for downstream handlers.
///
/// Only requests that declare a non-zero `Content-Length` are read. The returned
/// bytes are empty when nothing was captured.
pub async fn replay_request_body(request: Request<Body>) -> (Request<Body>, Bytes) {
    if declared_length(request.headers()) == 0 {
        return (request, Bytes::new());
    }

    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let replay = Body::from(bytes.clone());
            (Request::from_parts(parts, replay), bytes)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Request body capture failed");
            let failed = Body::new(FailedBody(Some(e)));
            (Request::from_parts(parts, failed), Bytes::new())
        }
    }
}

/// Body that yields one stored read error, then ends.
struct FailedBody(Option<axum::Error>);

impl HttpBody for FailedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.0.take().map(Err))
    }
}

type OnComplete = Box<dyn FnOnce(Vec<u8>) + Send + 'static>;

/// Response body wrapper that copies every data frame into a buffer.
pub struct CaptureBody {
    inner: Body,
    expected_len: Option<u64>,
    captured: Vec<u8>,
    on_complete: Option<OnComplete>,
}

impl CaptureBody {
    /// Wrap `inner`. `on_complete` receives the full captured body once the
    /// inner body has been exhausted.
    pub fn new<F>(inner: Body, on_complete: F) -> Self
    where
        F: FnOnce(Vec<u8>) + Send + 'static,
    {
        let expected_len = inner.size_hint().exact();
        let capacity = expected_len
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);

        Self {
            inner,
            expected_len,
            captured: Vec::with_capacity(capacity),
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// Treat the body as complete once `len` bytes went through, for
    /// responses whose length comes from a header rather than the body.
    pub fn with_declared_length(mut self, len: Option<u64>) -> Self {
        if len.is_some() {
            self.expected_len = len;
        }
        self
    }

    /// The inner body has nothing left to hand out.
    ///
    /// hyper stops polling once a declared length has been written, so the
    /// final `None` is not guaranteed to be observed.
    fn is_exhausted(&self) -> bool {
        self.inner.is_end_stream()
            || self
                .expected_len
                .is_some_and(|n| self.captured.len() as u64 >= n)
    }

    fn complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(std::mem::take(&mut self.captured));
        }
    }
}

impl HttpBody for CaptureBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.captured.extend_from_slice(data);
                }
                if this.is_exhausted() {
                    this.complete();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                // The response never finished; no record for it.
                this.on_complete = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.complete();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CaptureBody {
    fn drop(&mut self) {
        // Empty bodies may never be polled at all.
        if self.is_exhausted() {
            self.complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Body yielding fixed chunks, one per poll.
    struct Chunks {
        chunks: VecDeque<&'static str>,
        exact_len: Option<u64>,
    }

    impl Chunks {
        fn new(chunks: &[&'static str]) -> Self {
            Self {
                chunks: chunks.iter().copied().collect(),
                exact_len: None,
            }
        }

        /// Same chunks, announcing their total length up front.
        fn sized(chunks: &[&'static str]) -> Self {
            let total = chunks.iter().map(|c| c.len() as u64).sum();
            Self {
                exact_len: Some(total),
                ..Self::new(chunks)
            }
        }
    }

    impl HttpBody for Chunks {
        type Data = Bytes;
        type Error = axum::Error;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
            let chunk = self.chunks.pop_front();
            Poll::Ready(chunk.map(|c| Ok(Frame::data(Bytes::from_static(c.as_bytes())))))
        }

        fn size_hint(&self) -> SizeHint {
            match self.exact_len {
                Some(n) => SizeHint::with_exact(n),
                None => SizeHint::default(),
            }
        }
    }

    /// Body whose first poll fails.
    struct Broken;

    impl HttpBody for Broken {
        type Data = Bytes;
        type Error = axum::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
            Poll::Ready(Some(Err(axum::Error::new("connection reset"))))
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Vec<u8>>>>, impl FnOnce(Vec<u8>) + Send + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |bytes| sink.lock().unwrap().push(bytes))
    }

    fn json_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/test/echo")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_replay_keeps_body_readable() {
        let (request, captured) = replay_request_body(json_request(r#"{"message":"hi"}"#)).await;
        assert_eq!(&captured[..], br#"{"message":"hi"}"#);

        let downstream = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(downstream, captured);
    }

    #[tokio::test]
    async fn test_replay_forwards_read_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/test/echo")
            .header(header::CONTENT_LENGTH, 16)
            .body(Body::new(Broken))
            .unwrap();

        let (request, captured) = replay_request_body(request).await;
        assert!(captured.is_empty());

        let downstream = axum::body::to_bytes(request.into_body(), usize::MAX).await;
        assert!(downstream.is_err());
    }

    #[tokio::test]
    async fn test_replay_skips_undeclared_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("chunked payload"))
            .unwrap();

        let (request, captured) = replay_request_body(request).await;
        assert!(captured.is_empty());

        let downstream = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&downstream[..], b"chunked payload");
    }

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), 0);
        assert_eq!(content_length(&headers), None);
        headers.insert(header::CONTENT_LENGTH, "17".parse().unwrap());
        assert_eq!(declared_length(&headers), 17);
        assert_eq!(content_length(&headers), Some(17));
        headers.insert(header::CONTENT_LENGTH, "abc".parse().unwrap());
        assert_eq!(declared_length(&headers), 0);
    }

    #[tokio::test]
    async fn test_capture_is_transparent() {
        let (calls, on_complete) = recorder();
        let chunks = Chunks::new(&["{\"a\":", "1", "}"]);
        let body = Body::new(CaptureBody::new(Body::new(chunks), on_complete));

        let received = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&received[..], b"{\"a\":1}");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], b"{\"a\":1}".to_vec());
    }

    #[tokio::test]
    async fn test_full_body_completes_once() {
        let (calls, on_complete) = recorder();
        let body = Body::new(CaptureBody::new(Body::from("hello"), on_complete));

        let received = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&received[..], b"hello");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_body_completes_on_drop() {
        let (calls, on_complete) = recorder();
        let body = CaptureBody::new(Body::empty(), on_complete);
        assert!(body.is_end_stream());
        drop(body);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_empty());
    }

    #[test]
    fn test_abandoned_body_does_not_complete() {
        let (calls, on_complete) = recorder();
        let chunks = Chunks::new(&["partial", "rest"]);
        let body = CaptureBody::new(Body::new(chunks), on_complete);
        drop(body);

        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sized_body_completes_without_final_poll() {
        let (calls, on_complete) = recorder();
        let chunks = Chunks::sized(&["{\"a\":", "1}"]);
        let mut body = CaptureBody::new(Body::new(chunks), on_complete);

        // Stop after the announced bytes, the way hyper does for Content-Length.
        for _ in 0..2 {
            let frame = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await;
            assert!(frame.is_some_and(|f| f.is_ok()));
        }
        drop(body);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], b"{\"a\":1}".to_vec());
    }

    #[tokio::test]
    async fn test_declared_length_completes_unsized_body() {
        let (calls, on_complete) = recorder();
        let chunks = Chunks::new(&["{\"a\":", "1}"]);
        let mut body =
            CaptureBody::new(Body::new(chunks), on_complete).with_declared_length(Some(7));

        for _ in 0..2 {
            let frame = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await;
            assert!(frame.is_some_and(|f| f.is_ok()));
        }
        assert_eq!(calls.lock().unwrap().len(), 1);
        drop(body);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_sized_body_dropped_early_does_not_complete() {
        let (calls, on_complete) = recorder();
        let chunks = Chunks::sized(&["{\"a\":", "1}"]);
        drop(CaptureBody::new(Body::new(chunks), on_complete));

        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_size_hint_passes_through() {
        let (_calls, on_complete) = recorder();
        let body = CaptureBody::new(Body::from("12345"), on_complete);
        assert_eq!(body.size_hint().exact(), Some(5));
    }
}
