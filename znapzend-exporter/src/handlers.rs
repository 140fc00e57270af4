//! Request handlers for stage reports, job registration and scrapes.
//!
//! Every gauge-changing route answers both GET and POST; all input is read
//! from the URL. Handlers decode and validate, then hand typed values to
//! [`StageService`](znapzend_exporter_core::StageService).

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error, warn};

use znapzend_exporter_core::transition::TransitionOutcome;
use znapzend_exporter_core::{ExporterError, JobKey, PipelineStage};

use crate::error::{ApiError, ApiResult};
use crate::params::{StageQuery, job_label};
use crate::server::AppState;

/// Content type of the exposition served on `/metrics`.
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

// ============================================================================
// Response Types
// ============================================================================

/// Body of a successful stage report.
#[derive(Debug, Serialize)]
pub struct StageResponse {
    /// Always `"ok"`
    pub status: &'static str,
    /// Job label
    pub job: String,
    /// Stage set to 1
    pub stage: PipelineStage,
    /// Send destination, omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_host: Option<String>,
    /// Stages zeroed by this report
    pub reset: Vec<PipelineStage>,
    /// Pending self-reset delay, omitted when none was scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_reset_after_ms: Option<u64>,
}

impl StageResponse {
    fn new(key: &JobKey, outcome: TransitionOutcome) -> Self {
        Self {
            status: "ok",
            job: key.label().to_string(),
            stage: outcome.entered,
            target_host: key.target_host().map(str::to_string),
            reset: outcome.reset,
            self_reset_after_ms: outcome.self_reset_after.map(|d| d.as_millis() as u64),
        }
    }
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    status: &'static str,
    job: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_host: Option<String>,
    primed: Vec<PipelineStage>,
}

#[derive(Debug, Serialize)]
struct RegisterFailure {
    status: &'static str,
    job: String,
    error: String,
}

/// Body of an unregistration.
#[derive(Debug, Serialize)]
pub struct UnregisterResponse {
    /// Always `"unregistered"`
    pub status: &'static str,
    /// Job label
    pub job: String,
    /// Host whose send series were removed, omitted for the whole job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_host: Option<String>,
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
}

// ============================================================================
// Stage Reports
// ============================================================================

type QueryResult = Result<Query<StageQuery>, QueryRejection>;

fn decode(query: QueryResult) -> ApiResult<StageQuery> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| ApiError::InvalidQuery(rejection.body_text()))
}

fn report(
    state: &AppState,
    stage: PipelineStage,
    job: &str,
    query: QueryResult,
) -> ApiResult<Json<StageResponse>> {
    let report = decode(query)?.into_report(stage, job)?;
    let (key, outcome) = state.service.report(report)?;
    debug!(job = %key, stage = %stage, reset = ?outcome.reset, "Stage reported");
    Ok(Json(StageResponse::new(&key, outcome)))
}

pub async fn presnap(
    State(state): State<AppState>,
    Path(job): Path<String>,
    query: QueryResult,
) -> ApiResult<Json<StageResponse>> {
    report(&state, PipelineStage::PreSnap, &job, query)
}

pub async fn postsnap(
    State(state): State<AppState>,
    Path(job): Path<String>,
    query: QueryResult,
) -> ApiResult<Json<StageResponse>> {
    report(&state, PipelineStage::PostSnap, &job, query)
}

pub async fn presend(
    State(state): State<AppState>,
    Path(job): Path<String>,
    query: QueryResult,
) -> ApiResult<Json<StageResponse>> {
    report(&state, PipelineStage::PreSend, &job, query)
}

pub async fn postsend(
    State(state): State<AppState>,
    Path(job): Path<String>,
    query: QueryResult,
) -> ApiResult<Json<StageResponse>> {
    report(&state, PipelineStage::PostSend, &job, query)
}

// ============================================================================
// Registration
// ============================================================================

pub async fn register(
    State(state): State<AppState>,
    Path(job): Path<String>,
    query: QueryResult,
) -> ApiResult<Response> {
    let label = job_label(&job)?;
    let query = decode(query)?;
    // Reject malformed parameters the same way stage reports do
    query.reset_flags()?;
    query.self_reset_after()?;

    match state.service.register(&label, query.target_host()) {
        Ok((key, outcome)) => Ok(Json(RegisterResponse {
            status: "registered",
            job: key.label().to_string(),
            target_host: key.target_host().map(str::to_string),
            primed: outcome.primed,
        })
        .into_response()),
        Err(e) => {
            warn!(job = %label, error = %e, "Could not register job");
            let status = ApiError::from(e.clone()).status();
            let body = RegisterFailure {
                status: "failed",
                job: label,
                error: e.to_string(),
            };
            Ok((status, Json(body)).into_response())
        }
    }
}

pub async fn unregister(
    State(state): State<AppState>,
    Path(job): Path<String>,
    query: QueryResult,
) -> ApiResult<Json<UnregisterResponse>> {
    let label = job_label(&job)?;
    let query = decode(query)?;
    let key = state.service.unregister(&label, query.target_host())?;
    Ok(Json(UnregisterResponse {
        status: "unregistered",
        job: key.label().to_string(),
        target_host: key.target_host().map(str::to_string),
    }))
}

// ============================================================================
// Scrape and Banner
// ============================================================================

/// OpenMetrics text exposition of the whole registry.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let mut buffer = String::new();

    if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &state.registry) {
        error!(error = %e, "Failed to encode metrics");
        return ApiError::Encoding(e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
        buffer,
    )
        .into_response()
}

pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "exporter reachable. You might want to check /metrics",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Path prefixes of the job operations.
pub const OPERATIONS: [&str; 6] = [
    "presnap",
    "postsnap",
    "presend",
    "postsend",
    "register",
    "unregister",
];

/// Fallback for unmatched paths. An operation without a job segment is a
/// missing-job error rather than an unknown route.
pub async fn not_found(uri: Uri) -> ApiError {
    let path = uri.path();
    if OPERATIONS.contains(&path.trim_matches('/')) {
        return ExporterError::MissingJobLabel.into();
    }
    ApiError::NotFound(path.to_string())
}
