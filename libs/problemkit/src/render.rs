//! Turning an [`ApiError`] into an `application/problem+json` response.

use std::any::Any;
use std::num::FpCategory;
use std::sync::Arc;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use problemkit_errors::{
    APPLICATION_PROBLEM_JSON, Detail, Problem, ProblemType, RequestValidationError,
    is_body_allowed_for_status,
};
use serde_json::{Map, Value};

use crate::config::ProblemDetailsConfig;
use crate::context::RequestInfo;
use crate::error::{ApiError, CaughtPanic, HttpError, UnhandledError};
use crate::handlers;
use crate::reporter::{ErrorReporter, TracingReporter};

/// `detail` of a validation problem outside legacy mode.
pub const VALIDATION_DETAIL: &str = "Request validation failed; see `errors` for details.";

/// Renders errors according to one [`ProblemDetailsConfig`].
///
/// Immutable after construction; clones share the configuration and reporter.
#[derive(Clone)]
pub struct ProblemRenderer {
    config: Arc<ProblemDetailsConfig>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ProblemRenderer {
    /// Renderer that reports through [`TracingReporter`].
    #[must_use]
    pub fn new(config: ProblemDetailsConfig) -> Self {
        Self::with_reporter(config, Arc::new(TracingReporter))
    }

    #[must_use]
    pub fn with_reporter(config: ProblemDetailsConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            config: Arc::new(config),
            reporter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ProblemDetailsConfig {
        &self.config
    }

    #[must_use]
    pub fn render(&self, error: &ApiError, request: &RequestInfo) -> Response {
        match error {
            ApiError::Validation(err) => self.validation_problem(err, request).into_response(),
            ApiError::Http(err) => self.http_error(err, request),
            ApiError::Unhandled(err) => self.unhandled(err, request),
        }
    }

    /// 422 problem with normalized `errors`; `detail` depends on `legacy_mode`.
    pub fn validation_problem(&self, err: &RequestValidationError, request: &RequestInfo) -> Problem {
        let detail = if self.config.legacy_mode {
            Detail::Items(err.raw_errors())
        } else {
            Detail::Text(VALIDATION_DETAIL.to_owned())
        };

        let mut problem = ProblemType::VALIDATION
            .as_problem(&self.config.type_base, detail)
            .with_errors(err.normalized());
        if self.config.debug {
            problem = problem.with_debug_hint(err.to_string());
        }
        self.with_request_context(problem, request)
    }

    fn http_error(&self, err: &HttpError, request: &RequestInfo) -> Response {
        if !self.config.override_http_exceptions {
            return handlers::http_error_response(err);
        }

        let status = err.status;
        let body_allowed = is_body_allowed_for_status(status.as_u16());
        let mut response = match detail_as_problem(err.detail.as_ref()) {
            _ if !body_allowed => status.into_response(),
            Some(problem) => problem_json(status, Value::Object(problem.clone())),
            None => self.http_problem(err, request).into_response(),
        };
        response.headers_mut().extend(err.headers.clone());
        response
    }

    /// Problem for an explicit HTTP error whose detail is not already a problem.
    pub fn http_problem(&self, err: &HttpError, request: &RequestInfo) -> Problem {
        let status = err.status;
        let type_url = ProblemType::HTTP_ERROR.type_uri(&self.config.type_base);

        let problem = match err.detail.as_ref() {
            Some(Value::Array(items)) if self.config.legacy_mode => {
                Problem::new(status, status.as_u16().to_string(), items.clone())
            }
            detail => {
                let text = detail.and_then(detail_text);
                let title = text.clone().unwrap_or_else(|| ProblemType::HTTP_ERROR.title.to_owned());
                Problem::new(status, title, "").with_detail(text.map(Detail::Text))
            }
        };
        self.with_request_context(problem.with_type(type_url), request)
    }

    fn unhandled(&self, err: &UnhandledError, request: &RequestInfo) -> Response {
        self.reporter.report_unhandled(request, err);

        let hint = self.config.debug.then(|| err.to_string());
        let problem = self.internal_problem(hint);
        self.with_request_context(problem, request).into_response()
    }

    /// Response for a panic caught by the panic layer. Reports the panic and
    /// marks the response so the middleware can add request context.
    #[must_use]
    pub fn panic_response(&self, payload: &(dyn Any + Send)) -> Response {
        let message = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&'static str>().copied());
        self.reporter.report_panic(message);

        let mut response = self.panic_problem(message, None).into_response();
        response
            .extensions_mut()
            .insert(CaughtPanic(message.map(str::to_owned)));
        response
    }

    /// Generic 500 problem for a panic; the message is only used in debug mode.
    pub fn panic_problem(&self, message: Option<&str>, request: Option<&RequestInfo>) -> Problem {
        let hint = message.filter(|_| self.config.debug).map(str::to_owned);
        let problem = self.internal_problem(hint);
        match request {
            Some(request) => self.with_request_context(problem, request),
            None => problem,
        }
    }

    fn internal_problem(&self, hint: Option<String>) -> Problem {
        ProblemType::INTERNAL.as_problem(
            &self.config.type_base,
            hint.unwrap_or_else(|| ProblemType::INTERNAL.title.to_owned()),
        )
    }

    fn with_request_context(&self, problem: Problem, request: &RequestInfo) -> Problem {
        if !self.config.include_request_context {
            return problem;
        }
        problemkit_errors::finalize(problem, &request.path, request.trace_id.clone())
    }
}

/// A detail object that names its own `type` is already a problem.
fn detail_as_problem(detail: Option<&Value>) -> Option<&Map<String, Value>> {
    match detail {
        Some(Value::Object(obj)) if obj.contains_key("type") => Some(obj),
        _ => None,
    }
}

/// Text of a non-empty detail; non-string values use their JSON text.
///
/// `false` and zero count as empty, like an empty string or collection.
fn detail_text(detail: &Value) -> Option<String> {
    let is_empty = match detail {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64().map(f64::classify) == Some(FpCategory::Zero),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
    };
    if is_empty {
        return None;
    }
    Some(detail.as_str().map_or_else(|| detail.to_string(), str::to_owned))
}

fn problem_json(status: StatusCode, body: Value) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
    );
    response
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::http::Method;
    use problemkit_errors::ValidationErrorRecord;
    use serde_json::json;

    fn request() -> RequestInfo {
        RequestInfo {
            method: Method::POST,
            path: "/users".to_owned(),
            trace_id: Some("trace-1".to_owned()),
        }
    }

    fn renderer(config: ProblemDetailsConfig) -> ProblemRenderer {
        ProblemRenderer::new(config)
    }

    fn missing_name() -> RequestValidationError {
        RequestValidationError::new(vec![ValidationErrorRecord::new(
            vec!["body".into(), "user".into(), "name".into()],
            "Field required",
            "missing",
        )])
    }

    #[test]
    fn legacy_validation_problem_keeps_raw_detail() {
        let problem = renderer(ProblemDetailsConfig::default()).validation_problem(&missing_name(), &request());

        assert_eq!(problem.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(problem.type_url, "https://example.com/problems/validation");
        assert_eq!(problem.title, "Request validation error");
        assert_eq!(problem.detail, Some(Detail::Items(missing_name().raw_errors())));
        assert_eq!(problem.errors.as_ref().unwrap()[0].pointer, "/user/name");
        assert!(problem.debug_hint.is_none());
        assert!(problem.instance.is_none());
    }

    #[test]
    fn modern_validation_problem_uses_fixed_detail() {
        let config = ProblemDetailsConfig {
            legacy_mode: false,
            debug: true,
            ..ProblemDetailsConfig::default()
        };
        let problem = renderer(config).validation_problem(&missing_name(), &request());

        assert_eq!(problem.detail, Some(Detail::Text(VALIDATION_DETAIL.to_owned())));
        assert_eq!(problem.debug_hint, Some(missing_name().to_string()));
    }

    #[test]
    fn request_context_is_opt_in() {
        let config = ProblemDetailsConfig {
            include_request_context: true,
            ..ProblemDetailsConfig::default()
        };
        let problem = renderer(config).validation_problem(&missing_name(), &request());

        assert_eq!(problem.instance.as_deref(), Some("/users"));
        assert_eq!(problem.trace_id.as_deref(), Some("trace-1"));
    }

    #[test]
    fn http_problem_text_detail() {
        let err = HttpError::new(StatusCode::FORBIDDEN).with_detail("Not your team");
        let problem = renderer(ProblemDetailsConfig::default()).http_problem(&err, &request());

        assert_eq!(problem.type_url, "https://example.com/problems/http-error");
        assert_eq!(problem.title, "Not your team");
        assert_eq!(problem.detail, Some(Detail::Text("Not your team".to_owned())));
    }

    #[test]
    fn http_problem_without_detail() {
        let err = HttpError::new(StatusCode::BAD_REQUEST).without_detail();
        let problem = renderer(ProblemDetailsConfig::default()).http_problem(&err, &request());

        assert_eq!(problem.title, "HTTP Error");
        assert!(problem.detail.is_none());
        assert_eq!(serde_json::to_value(&problem).unwrap()["detail"], Value::Null);
    }

    #[test]
    fn http_problem_list_detail() {
        let err = HttpError::new(StatusCode::BAD_REQUEST).with_detail(json!(["a", "b"]));

        let legacy = renderer(ProblemDetailsConfig::default()).http_problem(&err, &request());
        assert_eq!(legacy.title, "400");
        assert_eq!(legacy.detail, Some(Detail::Items(vec![json!("a"), json!("b")])));

        let config = ProblemDetailsConfig {
            legacy_mode: false,
            ..ProblemDetailsConfig::default()
        };
        let modern = renderer(config).http_problem(&err, &request());
        assert_eq!(modern.title, r#"["a","b"]"#);
        assert_eq!(modern.detail, Some(Detail::Text(r#"["a","b"]"#.to_owned())));
    }

    #[test]
    fn detail_text_treats_empty_values_as_absent() {
        assert_eq!(detail_text(&json!("")), None);
        assert_eq!(detail_text(&json!([])), None);
        assert_eq!(detail_text(&json!({})), None);
        assert_eq!(detail_text(&json!(42)), Some("42".to_owned()));
    }

    #[test]
    fn detail_text_treats_false_and_zero_as_absent() {
        assert_eq!(detail_text(&json!(false)), None);
        assert_eq!(detail_text(&json!(0)), None);
        assert_eq!(detail_text(&json!(0.0)), None);
        assert_eq!(detail_text(&json!(true)), Some("true".to_owned()));
        assert_eq!(detail_text(&json!(-1)), Some("-1".to_owned()));

        let err = HttpError::new(StatusCode::BAD_REQUEST).with_detail(false);
        let problem = renderer(ProblemDetailsConfig::default()).http_problem(&err, &request());
        assert_eq!(problem.title, "HTTP Error");
        assert!(problem.detail.is_none());
    }

    #[test]
    fn internal_problem_is_generic_without_hint() {
        let problem = renderer(ProblemDetailsConfig::default()).internal_problem(None);
        assert_eq!(problem.type_url, "about:blank");
        assert_eq!(problem.detail, Some(Detail::Text("Internal Server Error".to_owned())));
    }

    #[test]
    fn panic_response_is_500() {
        let payload: Box<dyn Any + Send> = Box::new("boom at line 3");
        let response = renderer(ProblemDetailsConfig::default()).panic_response(payload.as_ref());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let caught = response.extensions().get::<CaughtPanic>().unwrap();
        assert_eq!(caught.0.as_deref(), Some("boom at line 3"));
    }

    #[test]
    fn panic_problem_with_request_context() {
        let config = ProblemDetailsConfig {
            include_request_context: true,
            ..ProblemDetailsConfig::default()
        };
        let problem = renderer(config).panic_problem(Some("boom"), Some(&request()));

        assert_eq!(problem.instance.as_deref(), Some("/users"));
        assert_eq!(problem.trace_id.as_deref(), Some("trace-1"));
        assert_eq!(problem.detail, Some(Detail::Text("Internal Server Error".to_owned())));
    }
}
