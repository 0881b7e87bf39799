//! exec-node: a polyglot execution-dispatch node
//!
//! One node in a polyglot execution fabric: a central coordinator sends
//! each node source code for the language family it owns, and the node
//! answers with a structured result (status, timing, exit code, captured
//! output).
//!
//! Features:
//! - TCP server mode with framed HTTP-style responses
//! - Bridge mode for subprocess deployments (stdin/stdout, delimited results)
//! - Lenient base64 payload decoding
//! - Pluggable per-language execution engines with a generic fallback
//! - Configuration via CLI arguments or TOML file

mod bridge;
mod codec;
mod config;
mod connection;
mod executor;
mod request;
mod response;
mod server;

use config::{Config, Mode};
use executor::EngineRegistry;
use server::Server;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging. Bridge mode reserves stdout for result records,
    // so its logs go to stderr.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.mode {
        Mode::Server => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        Mode::Bridge => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
    }

    info!(
        host = %config.host,
        port = config.port,
        mode = ?config.mode,
        max_request_bytes = config.max_request_bytes,
        max_connections = config.max_connections,
        "Starting exec-node"
    );

    match config.mode {
        Mode::Server => Server::new(config).run().await,
        Mode::Bridge => bridge::run(Arc::new(EngineRegistry::with_default_engines())).await,
    }
}
