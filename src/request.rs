//! Inbound request framing.
//!
//! The coordinator reaches a node in one of two outer framings:
//! - an HTTP-style POST with a JSON body, or
//! - a bare JSON object written directly to the connection.
//!
//! Either way the body carries a `language` tag and a base64 `encoded_source`
//! field, optionally nested under a `payload` wrapper. The parser is
//! incremental: it reports `Incomplete` until a full frame is buffered so
//! the connection layer can keep reading.

use serde_json::Value;

/// A parsed execution request. Connection-scoped; owned by its handler.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingRequest {
    /// Short language identifier, e.g. "cpp" or "rust".
    pub language: String,
    /// Base64-encoded source payload.
    pub encoded_source: String,
}

/// Request framing errors
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The peer stopped sending before a complete frame arrived.
    Truncated,
    /// The frame exceeded the configured size ceiling.
    TooLarge(usize),
    /// The body was not valid JSON.
    InvalidJson(String),
    /// A required field was missing or had the wrong type.
    MissingField(&'static str),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Truncated => write!(f, "request truncated before a complete frame"),
            FrameError::TooLarge(limit) => {
                write!(f, "request exceeded the {} byte limit", limit)
            }
            FrameError::InvalidJson(msg) => write!(f, "invalid JSON body: {}", msg),
            FrameError::MissingField(field) => write!(f, "missing request field: {}", field),
        }
    }
}

impl std::error::Error for FrameError {}

/// Result of parsing the bytes buffered so far
#[derive(Debug)]
pub enum ParseResult {
    /// A complete request frame was parsed.
    Complete(IncomingRequest),
    /// More bytes are needed before the frame can be judged.
    Incomplete,
    /// The frame is malformed and no amount of further data will fix it.
    Error(FrameError),
}

/// Parse the buffered bytes into a request frame.
pub fn parse(buffer: &[u8]) -> ParseResult {
    if buffer.is_empty() {
        return ParseResult::Incomplete;
    }

    if buffer[0] == b'{' {
        return parse_body(buffer);
    }

    // HTTP-style framing: headers end at the first blank line.
    let header_end = match find_header_end(buffer) {
        Some(pos) => pos,
        None => return ParseResult::Incomplete,
    };

    let head = &buffer[..header_end];
    let body = &buffer[header_end + 4..];

    // When the sender declares Content-Length, wait for exactly that many
    // body bytes before parsing.
    if let Some(declared) = content_length(head) {
        if body.len() < declared {
            return ParseResult::Incomplete;
        }
        return parse_body(&body[..declared]);
    }

    parse_body(body)
}

/// Parse a JSON body into an `IncomingRequest`.
fn parse_body(body: &[u8]) -> ParseResult {
    if body.is_empty() {
        return ParseResult::Incomplete;
    }

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) if e.is_eof() => return ParseResult::Incomplete,
        Err(e) => return ParseResult::Error(FrameError::InvalidJson(e.to_string())),
    };

    // The coordinator nests the request under a `payload` wrapper; bare
    // objects are accepted as well.
    let fields = value.get("payload").unwrap_or(&value);

    let language = match fields.get("language").and_then(Value::as_str) {
        Some(language) => language,
        None => return ParseResult::Error(FrameError::MissingField("language")),
    };

    let encoded_source = match fields
        .get("encoded_source")
        .or_else(|| fields.get("source"))
        .and_then(Value::as_str)
    {
        Some(encoded) => encoded,
        None => return ParseResult::Error(FrameError::MissingField("encoded_source")),
    };

    ParseResult::Complete(IncomingRequest {
        language: language.to_string(),
        encoded_source: encoded_source.to_string(),
    })
}

/// Find the `\r\n\r\n` separating headers from body, returning the offset
/// of the `\r`.
fn find_header_end(buffer: &[u8]) -> Option<usize> {
    (0..buffer.len().saturating_sub(3)).find(|&i| &buffer[i..i + 4] == b"\r\n\r\n")
}

/// Scan header lines for a Content-Length declaration.
fn content_length(head: &[u8]) -> Option<usize> {
    for line in head.split(|&b| b == b'\n') {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(_) => continue,
        };
        if let Some((name, rest)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                return rest.trim().parse().ok();
            }
        }
    }
    None
}
