//! DevOps practice server.
//!
//! A small HTTP test harness: endpoints that echo, sleep and fail at random,
//! wrapped by a middleware that prints one JSON record per request to stdout.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ─▶ TraceLayer ─▶ request_log ─▶ Timeout ─▶ CatchPanic ─▶ handlers
//!                              │
//!                              ├── x-request-id response header
//!                              └── stdout: {"timestamp":..,"severity":..,...}
//! ```

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "devops-prac-server")]
#[command(about = "HTTP test server with request/response logging", long_about = None)]
struct Cli {
    /// Optional TOML configuration file. SERVICE_NAME and PORT override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    devops_prac_server::lifecycle::startup::run(cli.config.as_deref()).await
}
