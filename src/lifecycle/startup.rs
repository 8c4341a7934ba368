//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize diagnostics
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only when ready)

use std::path::Path;

use crate::config::load_config;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::logging::init_logging;

/// Start the server and block until it has shut down.
pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        service_name = %config.service.name,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let server = HttpServer::new(config);
    let listener = server.bind().await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
