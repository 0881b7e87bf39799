//! Per-connection request handling.
//!
//! Each accepted connection is owned end-to-end by one handler task and
//! moves through a strictly sequential lifecycle: read the request frame,
//! decode the payload, execute, respond, close. There is no keep-alive;
//! the connection is closed unconditionally after one response, errors
//! included.

use crate::codec;
use crate::executor::EngineRegistry;
use crate::request::{self, FrameError, IncomingRequest, ParseResult};
use crate::response::{self, WireResponse};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

/// Initial read buffer capacity
const BUFFER_SIZE: usize = 4 * 1024;

/// Connection lifecycle states. Transitions are strictly sequential with
/// no branching back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Accumulating the request frame.
    Reading,
    /// Decoding the source payload.
    Decoding,
    /// Engine call in flight; elapsed time is being measured.
    Executing,
    /// Writing the response envelope.
    Responding,
    /// Terminal; the connection has been closed.
    Closed,
}

/// Handle a single connection: one request, one response, close.
///
/// All recoverable conditions are absorbed here and converted into a
/// best-effort error response; only I/O failures on the socket itself
/// propagate, and the listener merely logs those.
pub async fn handle_connection(
    mut stream: TcpStream,
    engines: Arc<EngineRegistry>,
    max_request_bytes: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut state = ConnState::Reading;
    trace!(?state, "Connection accepted");

    let response = match read_request(&mut stream, max_request_bytes).await? {
        Some(Ok(req)) => {
            state = ConnState::Decoding;
            trace!(?state, language = %req.language, "Request frame complete");

            let source = codec::decode(&req.encoded_source);
            debug!(
                language = %req.language,
                encoded_len = req.encoded_source.len(),
                decoded_len = source.len(),
                "Payload decoded"
            );

            state = ConnState::Executing;
            trace!(?state, "Handing off to engine");
            let outcome = engines.run(&req.language, &source).await;

            WireResponse::from_outcome(&outcome)
        }
        Some(Err(e)) => {
            warn!(error = %e, "Rejecting malformed request");
            WireResponse::request_error(&e)
        }
        None => {
            // Peer connected and closed without sending anything.
            trace!("Empty connection");
            return Ok(());
        }
    };

    state = ConnState::Responding;
    trace!(?state, status = response.status, "Writing response");

    let envelope = response::http_envelope(&response.to_json());
    stream.write_all(envelope.as_bytes()).await?;
    stream.shutdown().await?;

    state = ConnState::Closed;
    trace!(?state, "Connection done");
    Ok(())
}

/// Accumulate bytes until a full request frame is parseable.
///
/// Returns `None` when the peer closed without sending any bytes. A frame
/// that outgrows `max_request_bytes`, or a peer that stops sending
/// mid-frame, yields a `FrameError` instead of executing partial data.
async fn read_request<R: AsyncRead + Unpin>(
    stream: &mut R,
    max_request_bytes: usize,
) -> Result<Option<Result<IncomingRequest, FrameError>>, std::io::Error> {
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        match request::parse(&buffer) {
            ParseResult::Complete(req) => return Ok(Some(Ok(req))),
            ParseResult::Error(e) => return Ok(Some(Err(e))),
            ParseResult::Incomplete => {
                if buffer.len() >= max_request_bytes {
                    return Ok(Some(Err(FrameError::TooLarge(max_request_bytes))));
                }

                let n = stream.read_buf(&mut buffer).await?;
                if n == 0 {
                    if buffer.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(Err(FrameError::Truncated)));
                }
            }
        }
    }
}
