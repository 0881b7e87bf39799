//! Wire response construction.
//!
//! Every request ends in a fixed five-field JSON body wrapped in one of
//! two envelopes: an HTTP-style framed response (server mode) or a
//! marker-delimited record on stdout (bridge mode). Clients key off field
//! names, but the serialized order is stable anyway.

use crate::executor::ExecutionOutcome;
use crate::request::FrameError;
use serde::Serialize;

/// Status reported for every completed execution.
pub const STATUS_SUCCESS: &str = "success";

/// Status reported for requests that never reached an engine.
pub const STATUS_ERROR: &str = "error";

/// Opening marker for a delimited result record.
pub const RESULT_START: &str = "[RESULT_START]";

/// Closing marker for a delimited result record.
pub const RESULT_END: &str = "[RESULT_END]";

/// The fixed-shape response body. Field declaration order is the wire
/// order: status, engine, latency_ms, exit_code, stdout.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireResponse {
    pub status: &'static str,
    pub engine: String,
    pub latency_ms: u64,
    pub exit_code: i32,
    pub stdout: String,
}

impl WireResponse {
    /// Build the success response for a completed execution.
    pub fn from_outcome(outcome: &ExecutionOutcome) -> Self {
        WireResponse {
            status: STATUS_SUCCESS,
            engine: outcome.language.clone(),
            latency_ms: outcome.duration_ms,
            exit_code: outcome.exit_code,
            stdout: outcome.stdout_text.clone(),
        }
    }

    /// Build the error response for a request that never reached an
    /// engine (malformed, truncated, or oversized frame).
    pub fn request_error(error: &FrameError) -> Self {
        WireResponse {
            status: STATUS_ERROR,
            engine: "unknown".to_string(),
            latency_ms: 0,
            exit_code: -1,
            stdout: error.to_string(),
        }
    }

    /// Serialize to the canonical JSON body.
    ///
    /// The body is a struct of plain strings and integers, so
    /// serialization cannot fail; captured output is escaped by the
    /// serializer.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Wrap a JSON body in the framed HTTP-style envelope.
///
/// Content-Length is the exact byte length of the body that follows the
/// blank line. One response per connection; `Connection: close` always.
pub fn http_envelope(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        body.len(),
        body
    )
}

/// Wrap a JSON body in the delimited bridge envelope.
pub fn delimited_envelope(body: &str) -> String {
    format!("{}{}{}", RESULT_START, body, RESULT_END)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> ExecutionOutcome {
        ExecutionOutcome {
            language: "cpp".to_string(),
            stdout_text: "Output: ok".to_string(),
            exit_code: 0,
            duration_ms: 151,
        }
    }

    #[test]
    fn test_body_field_order_is_stable() {
        let body = WireResponse::from_outcome(&outcome()).to_json();
        assert_eq!(
            body,
            r#"{"status":"success","engine":"cpp","latency_ms":151,"exit_code":0,"stdout":"Output: ok"}"#
        );
    }

    #[test]
    fn test_stdout_is_escaped_for_embedding() {
        let mut outcome = outcome();
        outcome.stdout_text = "say \"hi\"\\done\nnext".to_string();

        let body = WireResponse::from_outcome(&outcome).to_json();
        assert!(body.contains(r#"\"hi\""#));
        assert!(body.contains(r#"\\done"#));
        assert!(body.contains(r#"\n"#));

        // The body must survive a round trip through a JSON parser.
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["stdout"], "say \"hi\"\\done\nnext");
    }

    #[test]
    fn test_error_responses_serialize() {
        let body = WireResponse::request_error(&FrameError::Truncated).to_json();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["exit_code"], -1);
        assert!(!parsed["stdout"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_http_envelope_content_length() {
        // Multibyte output: Content-Length must count bytes, not chars.
        let mut outcome = outcome();
        outcome.stdout_text = "héllo ✓".to_string();
        let body = WireResponse::from_outcome(&outcome).to_json();

        let envelope = http_envelope(&body);
        let (head, tail) = envelope.split_once("\r\n\r\n").unwrap();

        let declared: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(declared, tail.as_bytes().len());

        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert!(head.contains("Content-Type: application/json"));
        assert!(head.contains("Access-Control-Allow-Origin: *"));
        assert!(head.contains("Connection: close"));
    }

    #[test]
    fn test_delimited_envelope_markers() {
        let record = delimited_envelope(r#"{"status":"success"}"#);
        assert!(record.starts_with(RESULT_START));
        assert!(record.ends_with(RESULT_END));
        assert_eq!(
            &record[RESULT_START.len()..record.len() - RESULT_END.len()],
            r#"{"status":"success"}"#
        );
    }
}
