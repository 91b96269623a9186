//! Request context captured before the inner service runs.
//!
//! Responses no longer carry the request line, so the middleware records what
//! it needs up front: the method and path for logs and `instance`, and the
//! trace id propagated by the client or the current span.

use axum::extract::Request;
use axum::http::{HeaderMap, Method};

/// What the error layer knows about the request that failed.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub trace_id: Option<String>,
}

impl RequestInfo {
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            path: request.uri().path().to_owned(),
            trace_id: extract_trace_id(request.headers()),
        }
    }
}

/// Extract trace ID from headers or the current tracing span
#[must_use]
pub fn extract_trace_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-trace-id")
        .or_else(|| headers.get("x-request-id"))
        .or_else(|| headers.get("traceparent"))
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| {
            tracing::Span::current()
                .id()
                .map(|id| id.into_u64().to_string())
        })
}
