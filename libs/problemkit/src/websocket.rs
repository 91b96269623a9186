//! WebSocket connections never get JSON error bodies; they are closed instead.

use axum::http::{HeaderMap, header};
use problemkit_errors::RequestValidationError;
use serde_json::Value;

/// RFC 6455 close code 1008: the message violates the endpoint's policy.
pub const POLICY_VIOLATION: u16 = 1008;

/// A close frame's reason must fit in 123 bytes of UTF-8.
pub const MAX_CLOSE_REASON_BYTES: usize = 123;

/// How to close a socket whose handshake or message failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDirective {
    pub code: u16,
    pub reason: String,
}

/// Close with policy violation; the reason is the JSON error list, cut to fit.
#[must_use]
pub fn validation_close(err: &RequestValidationError) -> CloseDirective {
    let reason = Value::Array(err.raw_errors()).to_string();
    CloseDirective {
        code: POLICY_VIOLATION,
        reason: truncate_utf8(reason, MAX_CLOSE_REASON_BYTES),
    }
}

/// True for an HTTP/1.1 websocket upgrade handshake.
#[must_use]
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

fn truncate_utf8(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text
}
