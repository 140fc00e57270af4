//! Deferred self-reset of stage gauges.
//!
//! A caller reporting a stage may ask for the gauge to fall back to 0 after a
//! delay, for jobs that might never report their next stage.
//!
//! # Known Limitation
//!
//! Expiries are not cancellable and are not tied to the value they were
//! scheduled for. Each one unconditionally writes 0 when its delay elapses:
//!
//! ```text
//! t=0    presnap=1, expiry A scheduled for t=10
//! t=5    presnap=1, expiry B scheduled for t=10+5
//! t=10   A fires → presnap=0   (the report at t=5 is undone)
//! t=15   B fires → presnap=0
//! ```
//!
//! A fresh report made while an older expiry is pending is therefore cleared
//! early. There is intentionally no API to abort a pending expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::format_duration;
use crate::stage::{JobKey, PipelineStage};
use crate::telemetry::GaugeStore;

/// Schedules detached zero-writes on the gauge store.
#[derive(Clone)]
pub struct SelfExpiry {
    store: Arc<GaugeStore>,
}

impl SelfExpiry {
    /// Create a scheduler writing to `store`.
    pub fn new(store: Arc<GaugeStore>) -> Self {
        Self { store }
    }

    /// Write 0 to `(stage, key)` once `delay` has elapsed.
    ///
    /// The write runs on its own tokio task and never blocks the caller.
    /// Dropping the returned handle leaves the task running; it exists so
    /// tests can wait for the write.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, stage: PipelineStage, key: JobKey, delay: Duration) -> JoinHandle<()> {
        debug!(
            job = %key.label(),
            target_host = ?key.target_host(),
            stage = %stage,
            delay = %format_duration(delay),
            "Delaying stage reset"
        );

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match store.reset_stage(stage, &key) {
                Ok(()) => info!(
                    job = %key.label(),
                    target_host = ?key.target_host(),
                    stage = %stage,
                    delay = %format_duration(delay),
                    "Reset gauge"
                ),
                Err(e) => warn!(
                    job = %key.label(),
                    stage = %stage,
                    error = %e,
                    "Self-reset could not write gauge"
                ),
            }
        })
    }
}
