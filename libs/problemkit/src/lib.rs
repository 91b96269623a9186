//! RFC 7807 Problem Details for axum services.
//!
//! Handlers return [`ApiError`]; [`ProblemDetails::apply`] installs the layer
//! that renders those errors, and catches panics, according to a
//! [`ProblemDetailsConfig`]:
//!
//! ```ignore
//! let router = Router::new().route("/users", post(create_user));
//! let router = ProblemDetails::new(config::load(None)?).apply(router);
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod reporter;
pub mod websocket;

pub use config::{ConfigError, ProblemDetailsConfig};
pub use context::{RequestInfo, extract_trace_id};
pub use error::{ApiError, HttpError, UnhandledError};
pub use middleware::{PanicResponder, problem_details_middleware};
pub use render::ProblemRenderer;
pub use reporter::{ErrorReporter, TracingReporter};
pub use websocket::{CloseDirective, validation_close};

pub use problemkit_errors::{
    APPLICATION_PROBLEM_JSON, Detail, LocSegment, Problem, ProblemType, RequestValidationError,
    ValidationErrorRecord, ValidationViolation, build_pointer,
};

/// Installs problem details rendering on a router.
#[derive(Clone)]
pub struct ProblemDetails {
    renderer: ProblemRenderer,
}

impl ProblemDetails {
    /// Problem details reported through `tracing`.
    #[must_use]
    pub fn new(config: ProblemDetailsConfig) -> Self {
        Self {
            renderer: ProblemRenderer::new(config),
        }
    }

    /// Problem details reported through a custom [`ErrorReporter`].
    #[must_use]
    pub fn with_reporter(config: ProblemDetailsConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            renderer: ProblemRenderer::with_reporter(config, reporter),
        }
    }

    #[must_use]
    pub fn renderer(&self) -> &ProblemRenderer {
        &self.renderer
    }

    /// Wrap every route of `router`: the rendering middleware runs outermost
    /// so it sees the request of a panic caught just inside it.
    #[must_use]
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let panic_layer = CatchPanicLayer::custom(PanicResponder::new(self.renderer.clone()));
        let error_layer =
            axum::middleware::from_fn_with_state(self.renderer, problem_details_middleware);

        router.layer(ServiceBuilder::new().layer(error_layer).layer(panic_layer))
    }
}
