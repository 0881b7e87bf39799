//! Bridge deployment mode.
//!
//! When the node runs as a subprocess of the communication layer there is
//! no socket: requests arrive as newline-delimited JSON on stdin and each
//! result is written to stdout between `[RESULT_START]` and `[RESULT_END]`
//! markers, with no other framing. Stdout carries result records only;
//! logging goes to stderr in this mode.

use crate::codec;
use crate::executor::EngineRegistry;
use crate::request::{self, FrameError, ParseResult};
use crate::response::{self, WireResponse};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Read requests from stdin until EOF, answering each on stdout.
pub async fn run(engines: Arc<EngineRegistry>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Bridge online, reading requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = dispatch_line(&line, &engines).await;
        let record = response::delimited_envelope(&response.to_json());

        stdout.write_all(record.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("Stdin closed, bridge shutting down");
    Ok(())
}

/// Dispatch one request line through the decode/execute pipeline.
///
/// A line is a complete frame by definition: a partial JSON object can
/// never be finished by later lines, so it is reported as truncated.
async fn dispatch_line(line: &str, engines: &EngineRegistry) -> WireResponse {
    let request = match request::parse(line.as_bytes()) {
        ParseResult::Complete(request) => request,
        ParseResult::Incomplete => {
            warn!("Rejecting truncated request line");
            return WireResponse::request_error(&FrameError::Truncated);
        }
        ParseResult::Error(e) => {
            warn!(error = %e, "Rejecting malformed request line");
            return WireResponse::request_error(&e);
        }
    };

    let source = codec::decode(&request.encoded_source);
    debug!(
        language = %request.language,
        decoded_len = source.len(),
        "Payload decoded"
    );

    let outcome = engines.run(&request.language, &source).await;
    WireResponse::from_outcome(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_valid_line() {
        let engines = EngineRegistry::with_default_engines();
        let line = r#"{"language":"cpp","encoded_source":"aGVsbG8="}"#;

        let response = dispatch_line(line, &engines).await;
        assert_eq!(response.status, "success");
        assert_eq!(response.engine, "cpp");
        assert!(response.latency_ms > 0);
    }

    #[tokio::test]
    async fn test_dispatch_partial_line_is_truncated() {
        let engines = EngineRegistry::with_default_engines();

        let response = dispatch_line(r#"{"language":"cpp""#, &engines).await;
        assert_eq!(response.status, "error");
    }

    #[tokio::test]
    async fn test_record_framing() {
        let engines = EngineRegistry::with_default_engines();
        let line = r#"{"language":"rust","encoded_source":"Zm9v"}"#;

        let response = dispatch_line(line, &engines).await;
        let record = response::delimited_envelope(&response.to_json());

        assert!(record.starts_with("[RESULT_START]{"));
        assert!(record.ends_with("}[RESULT_END]"));
    }
}
