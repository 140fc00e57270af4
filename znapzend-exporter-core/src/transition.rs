//! Stage transitions and the reset policy table.
//!
//! Entering a stage sets its gauge to 1 and zeroes the other stages the
//! caller flagged for reset. Which stages *may* be reset from a given stage
//! is fixed by [`RESET_POLICY`]; the caller's [`ResetFlags`] select among
//! those candidates. The entered stage is never a candidate of itself.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::ExporterResult;
use crate::expiry::SelfExpiry;
use crate::stage::{JobKey, PipelineStage, ResetFlags};
use crate::telemetry::GaugeStore;

use crate::stage::PipelineStage::{PostSend, PostSnap, PreSend, PreSnap};

/// Stages eligible for a conditional reset, per entered stage.
///
/// Rows are in [`PipelineStage::ALL`] order so a row is found by
/// [`PipelineStage::index`].
pub const RESET_POLICY: [(PipelineStage, &[PipelineStage]); 4] = [
    (PreSnap, &[PostSnap, PreSend, PostSend]),
    (PostSnap, &[PreSnap, PreSend, PostSend]),
    (PreSend, &[PreSnap, PostSnap, PostSend]),
    (PostSend, &[PreSnap, PostSnap, PreSend]),
];

/// Reset candidates for `entered`.
#[must_use]
pub fn reset_candidates(entered: PipelineStage) -> &'static [PipelineStage] {
    RESET_POLICY[entered.index()].1
}

/// One stage report, consumed by [`StageTransition::enter`].
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    /// Job whose gauges change
    pub key: JobKey,
    /// Stage being reported
    pub entered: PipelineStage,
    /// Which other stages to zero
    pub reset_flags: ResetFlags,
    /// Delay before the entered gauge falls back to 0, zero for never
    pub self_reset_after: Duration,
}

/// What a transition changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The stage that was set to 1
    pub entered: PipelineStage,
    /// Stages that were zeroed, in policy order
    pub reset: Vec<PipelineStage>,
    /// Pending self-reset delay, if one was scheduled
    pub self_reset_after: Option<Duration>,
}

/// Applies stage reports to the gauge store.
#[derive(Clone)]
pub struct StageTransition {
    store: Arc<GaugeStore>,
    expiry: SelfExpiry,
}

impl StageTransition {
    /// Create a transition engine over `store`.
    pub fn new(store: Arc<GaugeStore>) -> Self {
        let expiry = SelfExpiry::new(Arc::clone(&store));
        Self { store, expiry }
    }

    /// Enter `request.entered` for `request.key`.
    ///
    /// Scheduling a self-reset spawns a tokio task, so a request with a
    /// non-zero `self_reset_after` must be entered from within a runtime.
    ///
    /// # Errors
    ///
    /// Fails when the store refuses to create series for the job. Nothing
    /// is written in that case.
    pub fn enter(&self, request: TransitionRequest) -> ExporterResult<TransitionOutcome> {
        let TransitionRequest {
            key,
            entered,
            reset_flags,
            self_reset_after,
        } = request;

        self.store.set_stage(entered, &key)?;

        let mut reset = Vec::with_capacity(3);
        for &stage in reset_candidates(entered) {
            if stage != entered && reset_flags.get(stage) {
                self.store.reset_stage(stage, &key)?;
                reset.push(stage);
            }
        }

        debug!(
            job = %key.label(),
            target_host = ?key.target_host(),
            stage = %entered,
            reset = ?reset,
            "Stage entered"
        );

        let self_reset_after = (!self_reset_after.is_zero()).then(|| {
            self.expiry.schedule(entered, key, self_reset_after);
            self_reset_after
        });

        Ok(TransitionOutcome {
            entered,
            reset,
            self_reset_after,
        })
    }
}
