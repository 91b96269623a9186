//! The three kinds of request failure the error layer knows how to render.
//!
//! Handlers return `Result<T, ApiError>`. Turning an `ApiError` into a
//! response does not render it yet: the error travels in a response extension
//! and [`crate::middleware::problem_details_middleware`] renders it with the
//! configured [`crate::render::ProblemRenderer`]. Without the middleware the
//! response produced here is a plain default rendering.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use problemkit_errors::{
    LocSegment, ProblemType, RequestValidationError, ValidationErrorRecord,
};
use serde_json::Value;

use crate::handlers;

/// Closed set of failures, resolved once at the framework boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request did not pass validation; rendered as 422.
    #[error(transparent)]
    Validation(#[from] RequestValidationError),
    /// A handler deliberately answered with an error status.
    #[error(transparent)]
    Http(#[from] HttpError),
    /// Anything else; rendered as a sanitized 500.
    #[error(transparent)]
    Unhandled(#[from] UnhandledError),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unhandled(UnhandledError(err))
    }
}

impl From<Vec<ValidationErrorRecord>> for ApiError {
    fn from(errors: Vec<ValidationErrorRecord>) -> Self {
        Self::Validation(RequestValidationError::new(errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let body_error = |kind: &str, msg: String| {
            Self::from(vec![ValidationErrorRecord::new(
                vec![LocSegment::field("body")],
                msg,
                kind,
            )])
        };
        match rejection {
            JsonRejection::JsonSyntaxError(e) => body_error("json_invalid", e.body_text()),
            JsonRejection::JsonDataError(e) => body_error("value_error", e.body_text()),
            other => Self::Http(HttpError::new(other.status()).with_detail(other.body_text())),
        }
    }
}

/// An explicit HTTP error: status, optional detail, extra response headers.
#[derive(Debug, Clone, thiserror::Error)]
#[error("HTTP {status}")]
pub struct HttpError {
    pub status: StatusCode,
    /// Defaults to the canonical reason phrase of `status`.
    pub detail: Option<Value>,
    pub headers: HeaderMap,
}

impl HttpError {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            detail: status.canonical_reason().map(Value::from),
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn without_detail(mut self) -> Self {
        self.detail = None;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Opaque application failure. Only its top-level message can reach a
/// response body, and only in debug mode.
pub struct UnhandledError(anyhow::Error);

impl UnhandledError {
    #[must_use]
    pub fn new(err: anyhow::Error) -> Self {
        Self(err)
    }

    #[must_use]
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Debug for UnhandledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for UnhandledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for UnhandledError {}

impl From<anyhow::Error> for UnhandledError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

/// Response extension carrying an error the middleware has yet to render.
///
/// An unhandled error that is dropped unclaimed is logged, so a router
/// without the middleware still records it once.
#[derive(Clone)]
pub(crate) struct PendingError(Arc<Pending>);

struct Pending {
    error: ApiError,
    claimed: AtomicBool,
}

impl PendingError {
    fn new(error: ApiError) -> Self {
        Self(Arc::new(Pending {
            error,
            claimed: AtomicBool::new(false),
        }))
    }

    /// Take responsibility for rendering and reporting the error.
    pub(crate) fn claim(&self) -> &ApiError {
        self.0.claimed.store(true, Ordering::Relaxed);
        &self.0.error
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if *self.claimed.get_mut() {
            return;
        }
        if let ApiError::Unhandled(err) = &self.error {
            tracing::error!(
                error = %format!("{:#}", err.inner()),
                "Unhandled error rendered without the problem details middleware"
            );
        }
    }
}

/// Response extension marking a response produced for a caught panic.
#[derive(Clone)]
pub(crate) struct CaughtPanic(pub(crate) Option<String>);

impl ApiError {
    /// Rendering used when no problem details middleware is installed.
    fn default_response(&self) -> Response {
        match self {
            Self::Validation(err) => handlers::validation_error_response(err),
            Self::Http(err) => handlers::http_error_response(err),
            Self::Unhandled(_) => ProblemType::INTERNAL
                .as_problem("", ProblemType::INTERNAL.title)
                .into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.default_response();
        response.extensions_mut().insert(PendingError::new(self));
        response
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::http::header;
    use tracing_test::traced_test;

    #[test]
    fn http_error_defaults_to_reason_phrase() {
        let err = HttpError::new(StatusCode::NOT_FOUND);
        assert_eq!(err.detail, Some(Value::from("Not Found")));
        assert_eq!(err.to_string(), "HTTP 404 Not Found");
    }

    #[test]
    fn http_error_builders() {
        let err = HttpError::new(StatusCode::UNAUTHORIZED)
            .with_detail("token expired")
            .with_header(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        assert_eq!(err.detail, Some(Value::from("token expired")));
        assert_eq!(err.headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        assert!(err.without_detail().detail.is_none());
    }

    #[test]
    fn anyhow_converts_to_unhandled() {
        let err = ApiError::from(anyhow::anyhow!("db down").context("loading user"));
        assert!(matches!(err, ApiError::Unhandled(_)));
        assert_eq!(err.to_string(), "loading user");
    }

    #[test]
    fn into_response_carries_pending_error() {
        let response = ApiError::from(HttpError::new(StatusCode::CONFLICT)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let pending = response.extensions().get::<PendingError>().unwrap();
        assert!(matches!(pending.claim(), ApiError::Http(_)));
    }

    #[test]
    fn unhandled_default_response_hides_message() {
        let response = ApiError::from(anyhow::anyhow!("secret dsn")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            problemkit_errors::APPLICATION_PROBLEM_JSON
        );
    }

    #[test]
    #[traced_test]
    fn unclaimed_unhandled_error_is_logged() {
        drop(ApiError::from(anyhow::anyhow!("pool exhausted").context("loading user")).into_response());
        assert!(logs_contain("without the problem details middleware"));
        assert!(logs_contain("loading user: pool exhausted"));
    }

    #[test]
    #[traced_test]
    fn claimed_unhandled_error_is_not_logged() {
        let response = ApiError::from(anyhow::anyhow!("replica lag")).into_response();
        let pending = response.extensions().get::<PendingError>().cloned().unwrap();
        assert!(matches!(pending.claim(), ApiError::Unhandled(_)));
        drop(response);
        drop(pending);
        assert!(!logs_contain("replica lag"));
    }

    #[test]
    #[traced_test]
    fn http_errors_are_never_logged() {
        drop(ApiError::from(HttpError::new(StatusCode::GONE).with_detail("archived")).into_response());
        assert!(!logs_contain("archived"));
    }
}
