//! Job registration and unregistration.
//!
//! ```text
//! Unregistered ──register──▶ Registered
//!      ▲                         │
//!      └───────unregister────────┘
//! ```
//!
//! Registration only primes a job's gauges to 0 so they appear in scrapes
//! before the first backup runs. Stage reports work in either state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ExporterResult;
use crate::stage::{JobKey, PipelineStage};
use crate::telemetry::GaugeStore;

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// Stages whose series were primed to 0
    pub primed: Vec<PipelineStage>,
}

/// Creates and destroys a job's full gauge set.
#[derive(Clone)]
pub struct JobLifecycle {
    store: Arc<GaugeStore>,
    host_aware: bool,
}

impl JobLifecycle {
    /// Create a lifecycle manager over `store`.
    ///
    /// With `host_aware` set, send-stage series are only primed when the key
    /// carries a target host.
    pub fn new(store: Arc<GaugeStore>, host_aware: bool) -> Self {
        Self { store, host_aware }
    }

    /// Prime the stage gauges for `key` to 0.
    ///
    /// Registering an already registered key primes it again and succeeds.
    ///
    /// # Errors
    ///
    /// Fails when the store refuses to create series for a new job.
    pub fn register(&self, key: &JobKey) -> ExporterResult<RegisterOutcome> {
        let prime_send = !self.host_aware || key.target_host().is_some();

        let mut primed = Vec::with_capacity(PipelineStage::ALL.len());
        for stage in PipelineStage::ALL {
            if stage.is_host_scoped() && !prime_send {
                continue;
            }
            self.store.reset_stage(stage, key)?;
            primed.push(stage);
        }

        info!(job = %key.label(), target_host = ?key.target_host(), primed = ?primed, "Registered job");
        Ok(RegisterOutcome { primed })
    }

    /// Delete every series associated with `key`. Unknown keys are a no-op.
    pub fn unregister(&self, key: &JobKey) {
        self.store.delete_series(key);
        debug!(job = %key.label(), target_host = ?key.target_host(), "Unregistered job");
    }
}
