//! Stage gauges backed by prometheus-client families.
//!
//! `GaugeStore` owns the four stage families and is the only component that
//! touches them. Every operation works on a single `(stage, key)` series;
//! callers never iterate or mutate the families directly. Writes and deletes
//! for one job label run under that label's index entry, so they never
//! interleave.
//!
//! # Metrics
//!
//! | Stage | Name | Labels |
//! |-------|------|--------|
//! | PreSnap | `<ns>_presnap_command_started` | `job` |
//! | PostSnap | `<ns>_postsnap_command_finished` | `job` |
//! | PreSend | `<ns>_presend_command_started` | `job`, `target_host` |
//! | PostSend | `<ns>_postsend_command_finished` | `job`, `target_host` |

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::debug;

use super::series_index::SeriesIndex;
use crate::error::ExporterResult;
use crate::stage::{JobKey, PipelineStage};

// ─────────────────────────────────────────────────────────────────────────────
// Label Sets
// ─────────────────────────────────────────────────────────────────────────────

/// Labels for snapshot-stage gauges.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct JobLabels {
    /// Job label (usually the dataset name)
    pub job: String,
}

/// Labels for send-stage gauges.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SendLabels {
    /// Job label
    pub job: String,
    /// Send destination, empty when absent
    pub target_host: String,
}

impl From<&JobKey> for JobLabels {
    fn from(key: &JobKey) -> Self {
        Self {
            job: key.label().to_string(),
        }
    }
}

impl From<&JobKey> for SendLabels {
    fn from(key: &JobKey) -> Self {
        Self {
            job: key.label().to_string(),
            target_host: key.target_host_label().to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "znapzend";

/// Default maximum number of distinct job labels.
pub const DEFAULT_MAX_JOBS: usize = 1000;

/// Settings for [`GaugeStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Prefix for every metric name
    pub namespace: String,
    /// Maximum distinct job labels, 0 for unlimited
    pub max_jobs: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_jobs: DEFAULT_MAX_JOBS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GaugeStore
// ─────────────────────────────────────────────────────────────────────────────

/// Label-keyed gauges for the four pipeline stages.
///
/// Writes create the series on first use. Snapshot stages ignore the key's
/// target host; send stages are keyed by label and host.
pub struct GaugeStore {
    presnap: Family<JobLabels, Gauge>,
    postsnap: Family<JobLabels, Gauge>,
    presend: Family<SendLabels, Gauge>,
    postsend: Family<SendLabels, Gauge>,
    index: SeriesIndex,
}

impl GaugeStore {
    /// Create the four stage families and register them with `registry`
    /// under `settings.namespace`.
    pub fn new(registry: &mut Registry, settings: &StoreSettings) -> Self {
        let registry = registry.sub_registry_with_prefix(&settings.namespace);

        let presnap = Family::<JobLabels, Gauge>::default();
        registry.register(
            "presnap_command_started",
            "whether the command to run prior zfs snapshot was started",
            presnap.clone(),
        );

        let postsnap = Family::<JobLabels, Gauge>::default();
        registry.register(
            "postsnap_command_finished",
            "whether the command to run after zfs snapshot was finished",
            postsnap.clone(),
        );

        let presend = Family::<SendLabels, Gauge>::default();
        registry.register(
            "presend_command_started",
            "whether the command to run prior zfs send was started",
            presend.clone(),
        );

        let postsend = Family::<SendLabels, Gauge>::default();
        registry.register(
            "postsend_command_finished",
            "whether the command to run after zfs send was finished",
            postsend.clone(),
        );

        Self {
            presnap,
            postsnap,
            presend,
            postsend,
            index: SeriesIndex::new(settings.max_jobs),
        }
    }

    /// Set the gauge at `(stage, key)` to 1.
    ///
    /// # Errors
    ///
    /// [`ExporterError::SeriesLimitExceeded`](crate::error::ExporterError)
    /// when `key` names a new job and the store is full.
    pub fn set_stage(&self, stage: PipelineStage, key: &JobKey) -> ExporterResult<()> {
        self.write(stage, key, 1)
    }

    /// Set the gauge at `(stage, key)` to 0, creating the series if needed.
    ///
    /// # Errors
    ///
    /// Same as [`GaugeStore::set_stage`].
    pub fn reset_stage(&self, stage: PipelineStage, key: &JobKey) -> ExporterResult<()> {
        self.write(stage, key, 0)
    }

    fn write(&self, stage: PipelineStage, key: &JobKey, value: i64) -> ExporterResult<()> {
        self.index.admit_with(key, stage.is_host_scoped(), || {
            match stage {
                PipelineStage::PreSnap => self.presnap.get_or_create(&JobLabels::from(key)).set(value),
                PipelineStage::PostSnap => self.postsnap.get_or_create(&JobLabels::from(key)).set(value),
                PipelineStage::PreSend => self.presend.get_or_create(&SendLabels::from(key)).set(value),
                PipelineStage::PostSend => self.postsend.get_or_create(&SendLabels::from(key)).set(value),
            };
        })
    }

    /// Remove every series belonging to `key`.
    ///
    /// Snapshot series of the label are always removed. Send series are
    /// removed for the key's host, or for every known host when the key has
    /// none. Absent keys are a no-op. Writes to the same label wait until
    /// the removal is complete.
    pub fn delete_series(&self, key: &JobKey) {
        self.index.release_with(key, |hosts| {
            let job = JobLabels::from(key);
            self.presnap.remove(&job);
            self.postsnap.remove(&job);

            for target_host in hosts {
                let labels = SendLabels {
                    job: key.label().to_string(),
                    target_host: target_host.clone(),
                };
                self.presend.remove(&labels);
                self.postsend.remove(&labels);
            }
        });
        debug!(job = %key.label(), target_host = ?key.target_host(), "Deleted series");
    }

    /// Current value at `(stage, key)`, 0 when the series does not exist.
    ///
    /// Never creates a series.
    #[must_use]
    pub fn value_of(&self, stage: PipelineStage, key: &JobKey) -> i64 {
        match stage {
            PipelineStage::PreSnap => self.presnap.get(&JobLabels::from(key)).map(|g| g.get()),
            PipelineStage::PostSnap => self.postsnap.get(&JobLabels::from(key)).map(|g| g.get()),
            PipelineStage::PreSend => self.presend.get(&SendLabels::from(key)).map(|g| g.get()),
            PipelineStage::PostSend => self.postsend.get(&SendLabels::from(key)).map(|g| g.get()),
        }
        .unwrap_or(0)
    }

    /// Whether a series exists at `(stage, key)`.
    #[must_use]
    pub fn has_series(&self, stage: PipelineStage, key: &JobKey) -> bool {
        match stage {
            PipelineStage::PreSnap => self.presnap.get(&JobLabels::from(key)).is_some(),
            PipelineStage::PostSnap => self.postsnap.get(&JobLabels::from(key)).is_some(),
            PipelineStage::PreSend => self.presend.get(&SendLabels::from(key)).is_some(),
            PipelineStage::PostSend => self.postsend.get(&SendLabels::from(key)).is_some(),
        }
    }

    /// Number of job labels that currently own series.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.index.job_count()
    }
}
