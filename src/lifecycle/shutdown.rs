//! Stop signal shared by the listener and test harnesses.
//!
//! `startup::run` owns one `Shutdown`. The signal task fires it on Ctrl-C or
//! SIGTERM, and `HttpServer::run` holds a receiver. Once fired, axum stops
//! accepting connections and drains in-flight requests, so every request the
//! server already answered still gets its stdout record.

use tokio::sync::broadcast;

/// One-shot stop broadcast.
pub struct Shutdown {
    stop: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stop, _) = broadcast::channel(1);
        Self { stop }
    }

    /// Receiver for `HttpServer::run` or any task that must stop with it.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.stop.subscribe()
    }

    /// Tell every subscriber to stop. Firing with nobody listening is fine:
    /// a server that already exited needs no signal.
    pub fn trigger(&self) {
        let _ = self.stop.send(());
    }

    /// Subscribers that have not been dropped yet.
    pub fn receiver_count(&self) -> usize {
        self.stop.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
