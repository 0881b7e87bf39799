//! TCP listener for execution requests.
//!
//! Binds the configured endpoint and hands each accepted connection to its
//! own task. The listener holds no per-request state; it is a pure
//! dispatch point in front of the connection handlers.

use crate::config::Config;
use crate::connection::handle_connection;
use crate::executor::EngineRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Server instance
pub struct Server {
    config: Config,
    engines: Arc<EngineRegistry>,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance with the stock engine registry.
    pub fn new(config: Config) -> Self {
        let connection_limit = Arc::new(Semaphore::new(config.max_connections));

        Server {
            config,
            engines: Arc::new(EngineRegistry::with_default_engines()),
            connection_limit,
        }
    }

    /// Bind the configured endpoint and start accepting connections.
    ///
    /// A bind failure is fatal: the error propagates to `main` and the
    /// process exits non-zero. A fixed port conflict is a configuration
    /// problem, not something a retry loop would heal.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("failed to bind {}: {}", addr, e))?;

        info!(address = %addr, max_connections = self.config.max_connections, "Node listening");

        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener.
    ///
    /// Each connection gets a fresh task; the loop never waits on a
    /// handler. Admission is gated by the connection-limit semaphore, so
    /// concurrent handlers are bounded instead of growing without limit.
    /// Handlers carry no deadline: a request that never finishes its
    /// engine call holds its permit indefinitely.
    async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            // Wait for a connection slot
            let permit = self.connection_limit.clone().acquire_owned().await?;

            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");

                    let engines = Arc::clone(&self.engines);
                    let max_request_bytes = self.config.max_request_bytes;

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, engines, max_request_bytes).await
                        {
                            debug!(error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    // Transient (fd exhaustion and the like); keep accepting.
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
