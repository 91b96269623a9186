//! Where unhandled errors get logged.
//!
//! The renderer receives an [`ErrorReporter`] at construction instead of
//! logging through a global, so tests and applications can swap it.

use crate::context::RequestInfo;
use crate::error::UnhandledError;

/// Sink for failures that end up as a generic 500.
///
/// Each unhandled error or panic is reported exactly once.
pub trait ErrorReporter: Send + Sync {
    /// Called with the full error; only its top-level message may reach a response.
    fn report_unhandled(&self, request: &RequestInfo, error: &UnhandledError);

    /// `message` is `None` when the panic payload was not a string.
    fn report_panic(&self, message: Option<&str>);
}

/// Default reporter: one `tracing` error event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report_unhandled(&self, request: &RequestInfo, error: &UnhandledError) {
        let chain = format!("{:#}", error.inner());
        tracing::error!(
            method = %request.method,
            path = %request.path,
            trace_id = request.trace_id.as_deref(),
            error = %chain,
            "Unhandled error in request"
        );
    }

    fn report_panic(&self, message: Option<&str>) {
        tracing::error!(
            panic = message.unwrap_or("<non-string panic payload>"),
            "Panic while handling request"
        );
    }
}
