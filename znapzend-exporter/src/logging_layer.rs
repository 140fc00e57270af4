//! Tower layer for structured request/response logging.
//!
//! Uses `tower_http::trace::TraceLayer` with callbacks that attach a
//! correlation id to every request span. Scrapes and health probes arrive
//! every few seconds, so their router uses [`quiet_logging_layer`] which logs
//! at debug instead of info.

use std::time::Duration;

use http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, MakeSpan, OnFailure, OnRequest, OnResponse, TraceLayer,
};
use tracing::{debug, info, warn};

/// Header carrying the caller's correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The configured trace layer type.
pub type RequestTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    CorrelationMakeSpan,
    OnRequestLogger,
    OnResponseLogger,
    DefaultOnBodyChunk,
    DefaultOnEos,
    OnFailureLogger,
>;

/// Layer for stage reports and registrations, logged at info.
pub fn logging_layer() -> RequestTraceLayer {
    build(false)
}

/// Layer for `/metrics` and health probes, logged at debug.
pub fn quiet_logging_layer() -> RequestTraceLayer {
    build(true)
}

fn build(quiet: bool) -> RequestTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(CorrelationMakeSpan)
        .on_request(OnRequestLogger { quiet })
        .on_response(OnResponseLogger { quiet })
        .on_failure(OnFailureLogger)
}

/// Span creator that attaches a `request_id` to every request span.
///
/// Uses the `x-request-id` header when present, otherwise a fresh UUID.
#[derive(Clone, Debug)]
pub struct CorrelationMakeSpan;

impl<B> MakeSpan<B> for CorrelationMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
        )
    }
}

#[derive(Clone, Debug)]
pub struct OnRequestLogger {
    quiet: bool,
}

impl<B> OnRequest<B> for OnRequestLogger {
    fn on_request(&mut self, request: &Request<B>, _span: &tracing::Span) {
        let query = request.uri().query().unwrap_or_default();
        if self.quiet {
            debug!(method = %request.method(), uri = %request.uri(), "Request received");
        } else {
            info!(
                method = %request.method(),
                path = %request.uri().path(),
                query = %query,
                "Request received"
            );
        }
    }
}

#[derive(Clone, Debug)]
pub struct OnResponseLogger {
    quiet: bool,
}

impl<B> OnResponse<B> for OnResponseLogger {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &tracing::Span) {
        let status = response.status().as_u16();
        let latency_ms = latency.as_millis() as u64;
        if response.status().is_client_error() {
            warn!(status, latency_ms, "Request rejected");
        } else if self.quiet {
            debug!(status, latency_ms, "Response sent");
        } else {
            info!(status, latency_ms, "Response sent");
        }
    }
}

#[derive(Clone, Debug)]
pub struct OnFailureLogger;

impl OnFailure<ServerErrorsFailureClass> for OnFailureLogger {
    fn on_failure(
        &mut self,
        failure: ServerErrorsFailureClass,
        latency: Duration,
        _span: &tracing::Span,
    ) {
        warn!(
            classification = %failure,
            latency_ms = latency.as_millis() as u64,
            "Request failed"
        );
    }
}
