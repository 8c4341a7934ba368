//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use devops_prac_server::config::{ServerConfig, SimulationConfig};
use devops_prac_server::http::HttpServer;
use devops_prac_server::lifecycle::Shutdown;
use devops_prac_server::observability::{MemorySink, RequestLogger};
use serde_json::Value;
use tokio::net::TcpListener;

/// A running server on an ephemeral port, recording into memory.
pub struct TestServer {
    pub addr: SocketAddr,
    pub sink: Arc<MemorySink>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Records emitted so far, parsed.
    pub fn records(&self) -> Vec<Value> {
        self.sink
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Wait until at least `n` records arrived; bodies finish streaming
    /// slightly after the client has read the response.
    pub async fn wait_for_records(&self, n: usize) -> Vec<Value> {
        for _ in 0..100 {
            if self.sink.len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.records()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config(fail: bool) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.service.name = "integration-svc".to_string();
    config.simulation = SimulationConfig::deterministic(fail);
    config
}

/// Start the server with the given config.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let sink = Arc::new(MemorySink::new());
    let server = HttpServer::with_sink(config, sink.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { addr, sink, shutdown }
}

/// Serve `routes` behind the server's middleware stack.
pub async fn serve_routes(routes: Router, config: &ServerConfig) -> TestServer {
    let sink = Arc::new(MemorySink::new());
    let logger = RequestLogger::new(config.service.name.as_str(), sink.clone());
    let router = HttpServer::layer_routes(routes, config, logger);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let mut server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await;
    });

    TestServer { addr, sink, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
