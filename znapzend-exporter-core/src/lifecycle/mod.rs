//! Process lifecycle: startup gating, readiness and shutdown signalling.
//!
//! ```text
//! Starting ──(registry + startup jobs done, listener bound)──▶ Ready
//!     │                                                        │
//!     └──────────────(SIGINT / SIGTERM)──▶ ShuttingDown ◀──────┘
//!                                              │
//!                                              ▼
//!                                           Stopped
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod health;

pub use health::{Readiness, StartupProgress, health_router};

/// Default bound on graceful shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Starting,
    Ready,
    ShuttingDown,
    Stopped,
}

impl LifecycleState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a shutdown has begun.
    #[must_use]
    pub fn is_draining(self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Stopped)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Time granted to in-flight requests once shutdown begins
    pub shutdown_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// A state together with the instant it was entered.
#[derive(Debug)]
struct Phase {
    state: LifecycleState,
    since: Instant,
}

impl Phase {
    fn enter(state: LifecycleState) -> Arc<Self> {
        Arc::new(Self {
            state,
            since: Instant::now(),
        })
    }
}

/// Shared by the signal handlers, the server and the health probes.
pub struct LifecycleManager {
    phase: ArcSwap<Phase>,
    started_at: Instant,
    shutdown: CancellationToken,
    registry_initialized: AtomicBool,
    startup_jobs_registered: AtomicBool,
    shutdown_timeout: Duration,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            phase: ArcSwap::new(Phase::enter(LifecycleState::Starting)),
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
            registry_initialized: AtomicBool::new(false),
            startup_jobs_registered: AtomicBool::new(false),
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.phase.load().state
    }

    /// Seconds spent in the current state.
    #[must_use]
    pub fn seconds_in_state(&self) -> u64 {
        self.phase.load().since.elapsed().as_secs()
    }

    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    #[must_use]
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn mark_registry_initialized(&self) {
        self.registry_initialized.store(true, Ordering::Release);
        debug!("Stage gauges registered");
    }

    pub fn mark_startup_jobs_registered(&self) {
        self.startup_jobs_registered.store(true, Ordering::Release);
        debug!("Startup jobs processed");
    }

    /// Startup steps completed so far.
    #[must_use]
    pub fn startup_progress(&self) -> StartupProgress {
        StartupProgress {
            registry_initialized: self.registry_initialized.load(Ordering::Acquire),
            startup_jobs_registered: self.startup_jobs_registered.load(Ordering::Acquire),
        }
    }

    /// Whether readiness probes should pass.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        let state = self.state();
        if state.is_draining() {
            return Readiness::NotReady(state.as_str().to_string());
        }
        if let Some(step) = self.startup_progress().pending_step() {
            return Readiness::NotReady(format!("waiting_for_{step}"));
        }
        if state != LifecycleState::Ready {
            return Readiness::NotReady(state.as_str().to_string());
        }
        Readiness::Ready
    }

    /// Child of the shutdown token, cancelled once shutdown begins.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Move from `Starting` to `Ready`. Ignored once a shutdown has begun.
    pub fn mark_ready(&self) {
        let previous = self.phase.rcu(|phase| {
            if phase.state.is_draining() {
                Arc::clone(phase)
            } else {
                Phase::enter(LifecycleState::Ready)
            }
        });
        if !previous.state.is_draining() {
            info!(
                version = self.version(),
                startup_ms = self.started_at.elapsed().as_millis() as u64,
                "Exporter ready"
            );
        }
    }

    /// Enter `ShuttingDown` and cancel the shutdown token. Only the first
    /// call has any effect.
    pub fn begin_shutdown(&self) {
        let previous = self.phase.rcu(|phase| {
            if phase.state.is_draining() {
                Arc::clone(phase)
            } else {
                Phase::enter(LifecycleState::ShuttingDown)
            }
        });
        if previous.state.is_draining() {
            return;
        }
        self.shutdown.cancel();
        info!(
            shutdown_timeout_secs = self.shutdown_timeout.as_secs(),
            "Shutdown initiated"
        );
    }

    pub fn mark_stopped(&self) {
        self.phase.store(Phase::enter(LifecycleState::Stopped));
        info!(uptime_seconds = self.uptime_seconds(), "Exporter stopped");
    }
}
