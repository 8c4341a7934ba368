//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request logging, timeout, panic recovery)
//! - Bind server to listener
//! - Stop gracefully on the shutdown signal
//!
//! # Layer Order (outermost first)
//! ```text
//! TraceLayer → request_log → TimeoutLayer → CatchPanicLayer → routes
//! ```
//! Timeouts and recovered panics are produced inside `request_log`, so they
//! still get a request record.

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::handlers;
use crate::observability::{request_log, LogSink, RequestLogger, StdoutSink};

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP server for the test harness.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server that writes request records to stdout.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    /// Create a server writing request records to `sink`.
    pub fn with_sink(config: ServerConfig, sink: Arc<dyn LogSink>) -> Self {
        let logger = RequestLogger::new(config.service.name.as_str(), sink);
        let router = Self::build_router(&config, logger);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &ServerConfig, logger: RequestLogger) -> Router {
        Self::layer_routes(handlers::routes(config.simulation.clone()), config, logger)
    }

    /// Wrap `routes` in the server's middleware stack.
    #[allow(deprecated)]
    pub fn layer_routes(routes: Router, config: &ServerConfig, logger: RequestLogger) -> Router {
        routes.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(logger, request_log))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                .layer(CatchPanicLayer::new()),
        )
    }

    /// Bind the configured listener address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.listener.bind_address.clone();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service_name = %self.config.service.name,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router with every layer applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
