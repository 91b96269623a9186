//! Centralized error mapping for Axum
//!
//! [`problem_details_middleware`] renders every [`ApiError`](crate::ApiError)
//! returned by a handler. [`PanicResponder`] turns panics into the same
//! generic 500 problem; it runs inside the middleware, which then adds the
//! request context. Responses that carry neither pass through untouched, as
//! do websocket handshakes.

use std::any::Any;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Response as HttpResponse;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::ResponseForPanic;

use crate::context::RequestInfo;
use crate::error::{CaughtPanic, PendingError};
use crate::render::ProblemRenderer;
use crate::websocket::is_websocket_upgrade;

/// Middleware function that renders pending errors as problem details.
pub async fn problem_details_middleware(
    State(renderer): State<ProblemRenderer>,
    request: Request,
    next: Next,
) -> Response {
    if is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let info = RequestInfo::from_request(&request);
    let mut response = next.run(request).await;

    if let Some(pending) = response.extensions_mut().remove::<PendingError>() {
        return renderer.render(pending.claim(), &info);
    }
    match response.extensions_mut().remove::<CaughtPanic>() {
        Some(CaughtPanic(message)) => renderer
            .panic_problem(message.as_deref(), Some(&info))
            .into_response(),
        None => response,
    }
}

/// `tower_http` panic handler that answers with a generic 500 problem.
#[derive(Clone)]
pub struct PanicResponder {
    renderer: ProblemRenderer,
}

impl PanicResponder {
    #[must_use]
    pub fn new(renderer: ProblemRenderer) -> Self {
        Self { renderer }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> HttpResponse<Self::ResponseBody> {
        self.renderer.panic_response(err.as_ref())
    }
}
