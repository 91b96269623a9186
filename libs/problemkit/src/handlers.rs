//! Default (non-problem) error responses: `{"detail": ...}` as `application/json`.
//!
//! Used for errors the configuration does not turn into problems, and when
//! no problem details middleware is installed.

use axum::Json;
use axum::response::{IntoResponse, Response};
use problemkit_errors::{RequestValidationError, is_body_allowed_for_status};
use serde_json::{Value, json};

use crate::error::HttpError;

/// `{"detail": <detail>}` with the error's status and headers; no body where
/// the status forbids one.
#[must_use]
pub fn http_error_response(err: &HttpError) -> Response {
    let mut response = if is_body_allowed_for_status(err.status.as_u16()) {
        let detail = err.detail.clone().unwrap_or(Value::Null);
        (err.status, Json(json!({ "detail": detail }))).into_response()
    } else {
        err.status.into_response()
    };
    response.headers_mut().extend(err.headers.clone());
    response
}

/// 422 with `{"detail": [records]}`.
#[must_use]
pub fn validation_error_response(err: &RequestValidationError) -> Response {
    (
        axum::http::StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": err.raw_errors() })),
    )
        .into_response()
}
