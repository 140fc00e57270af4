//! `/health/alive` and `/health/ready`.
//!
//! Liveness fails only once the process has stopped. Readiness fails until
//! every startup step is done and the listener is bound, and again as soon
//! as shutdown begins.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::{LifecycleManager, LifecycleState};

/// Completed startup steps, reported verbatim by the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartupProgress {
    pub registry_initialized: bool,
    pub startup_jobs_registered: bool,
}

impl StartupProgress {
    /// Name of the first step still outstanding.
    #[must_use]
    pub fn pending_step(&self) -> Option<&'static str> {
        [
            (self.registry_initialized, "registry_initialized"),
            (self.startup_jobs_registered, "startup_jobs_registered"),
        ]
        .into_iter()
        .find_map(|(done, name)| (!done).then_some(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady(String),
}

#[derive(Serialize)]
struct AliveBody {
    status: &'static str,
    state: LifecycleState,
    version: &'static str,
    uptime_seconds: u64,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    state: LifecycleState,
    seconds_in_state: u64,
    checks: StartupProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub fn health_router(lifecycle: Arc<LifecycleManager>) -> Router {
    Router::new()
        .route("/health/alive", get(alive))
        .route("/health/ready", get(ready))
        .with_state(lifecycle)
}

async fn alive(State(lifecycle): State<Arc<LifecycleManager>>) -> Response {
    let state = lifecycle.state();
    let (code, status) = match state {
        LifecycleState::Stopped => (StatusCode::SERVICE_UNAVAILABLE, "stopped"),
        _ => (StatusCode::OK, "alive"),
    };
    let body = AliveBody {
        status,
        state,
        version: lifecycle.version(),
        uptime_seconds: lifecycle.uptime_seconds(),
    };
    (code, Json(body)).into_response()
}

async fn ready(State(lifecycle): State<Arc<LifecycleManager>>) -> Response {
    let (code, status, reason) = match lifecycle.readiness() {
        Readiness::Ready => (StatusCode::OK, "ready", None),
        Readiness::NotReady(reason) => {
            (StatusCode::SERVICE_UNAVAILABLE, "not_ready", Some(reason))
        }
    };
    let body = ReadyBody {
        status,
        state: lifecycle.state(),
        seconds_in_state: lifecycle.seconds_in_state(),
        checks: lifecycle.startup_progress(),
        reason,
    };
    (code, Json(body)).into_response()
}
