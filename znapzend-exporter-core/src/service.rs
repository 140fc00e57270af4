//! Typed facade over the stage-gauge engine.
//!
//! Transports hand [`StageService`] already-parsed values. The service
//! applies the host-awareness rules, builds the [`JobKey`], and routes the
//! call to [`StageTransition`] or [`JobLifecycle`].

use std::sync::Arc;
use std::time::Duration;

use prometheus_client::registry::Registry;
use tracing::{info, warn};

use crate::config::{ExporterSettings, StartupJob};
use crate::error::{ExporterError, ExporterResult};
use crate::jobs::{JobLifecycle, RegisterOutcome};
use crate::stage::{JobKey, PipelineStage, ResetFlags};
use crate::telemetry::GaugeStore;
use crate::transition::{StageTransition, TransitionOutcome, TransitionRequest};

/// A stage report as received from a pipeline hook.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Stage being reported
    pub stage: PipelineStage,
    /// Job label, already stripped of any leading `/`
    pub label: String,
    /// Send destination, `None` or empty when absent
    pub target_host: Option<String>,
    /// Which other stages to zero
    pub reset_flags: ResetFlags,
    /// Self-reset delay, zero for never
    pub self_reset_after: Duration,
}

/// Entry point for every gauge-changing operation.
#[derive(Clone)]
pub struct StageService {
    store: Arc<GaugeStore>,
    transition: StageTransition,
    jobs: JobLifecycle,
    host_aware: bool,
}

impl StageService {
    /// Build the store inside `registry` and wire up the engine.
    pub fn new(registry: &mut Registry, settings: &ExporterSettings) -> Self {
        let store = Arc::new(GaugeStore::new(registry, &settings.store_settings()));
        Self {
            transition: StageTransition::new(Arc::clone(&store)),
            jobs: JobLifecycle::new(Arc::clone(&store), settings.host_aware),
            host_aware: settings.host_aware,
            store,
        }
    }

    /// Whether send stages are keyed by target host.
    #[must_use]
    pub fn host_aware(&self) -> bool {
        self.host_aware
    }

    /// The underlying gauge store.
    #[must_use]
    pub fn store(&self) -> &Arc<GaugeStore> {
        &self.store
    }

    fn key(&self, label: &str, target_host: Option<&str>) -> ExporterResult<JobKey> {
        let target_host = target_host.filter(|host| self.host_aware && !host.is_empty());
        JobKey::new(label, target_host)
    }

    /// Apply a stage report.
    ///
    /// # Errors
    ///
    /// - [`ExporterError::MissingJobLabel`] / [`ExporterError::InvalidLabel`]
    ///   for unusable labels
    /// - [`ExporterError::MissingTargetHost`] for a send stage without a host
    ///   while host awareness is on
    /// - [`ExporterError::SeriesLimitExceeded`] when the store is full
    pub fn report(&self, report: StageReport) -> ExporterResult<(JobKey, TransitionOutcome)> {
        // Snapshot stages are host-less, and so are the send series they reset
        let target_host = report
            .target_host
            .as_deref()
            .filter(|_| report.stage.is_host_scoped());
        let key = self.key(&report.label, target_host)?;

        if self.host_aware && report.stage.is_host_scoped() && key.target_host().is_none() {
            return Err(ExporterError::MissingTargetHost {
                stage: report.stage,
            });
        }

        let outcome = self.transition.enter(TransitionRequest {
            key: key.clone(),
            entered: report.stage,
            reset_flags: report.reset_flags,
            self_reset_after: report.self_reset_after,
        })?;
        Ok((key, outcome))
    }

    /// Register a job, priming its gauges to 0.
    ///
    /// # Errors
    ///
    /// Label errors as for [`StageService::report`], and
    /// [`ExporterError::SeriesLimitExceeded`] when the store is full.
    pub fn register(
        &self,
        label: &str,
        target_host: Option<&str>,
    ) -> ExporterResult<(JobKey, RegisterOutcome)> {
        let key = self.key(label, target_host)?;
        let outcome = self.jobs.register(&key)?;
        Ok((key, outcome))
    }

    /// Unregister a job. Unknown jobs succeed.
    ///
    /// # Errors
    ///
    /// Only label errors.
    pub fn unregister(&self, label: &str, target_host: Option<&str>) -> ExporterResult<JobKey> {
        let key = self.key(label, target_host)?;
        self.jobs.unregister(&key);
        Ok(key)
    }

    /// Register the configured startup jobs. Returns how many succeeded.
    ///
    /// Failures are logged and skipped so one bad entry cannot keep the
    /// exporter from starting.
    pub fn register_startup_jobs(&self, jobs: &[StartupJob]) -> usize {
        let mut registered = 0;
        for job in jobs {
            match self.register(&job.label, job.target_host.as_deref()) {
                Ok(_) => registered += 1,
                Err(e) => warn!(job = %job, error = %e, "Failed to register startup job"),
            }
        }
        if !jobs.is_empty() {
            info!(registered, total = jobs.len(), "Startup jobs registered");
        }
        registered
    }
}
