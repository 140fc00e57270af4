//! Pipeline stages and the keys that identify a job's gauges.
//!
//! A znapzend backup cycle moves through four stages:
//!
//! ```text
//! PreSnap → PostSnap → PreSend → PostSend
//! ```
//!
//! The ordering is semantic only. Any stage may be reported at any time and
//! nothing here enforces a sequence.

use std::fmt;

use serde::Serialize;

use crate::error::ExporterError;

// ─────────────────────────────────────────────────────────────────────────────
// PipelineStage
// ─────────────────────────────────────────────────────────────────────────────

/// One named point in the backup pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// The command run prior to `zfs snapshot` was started.
    PreSnap,
    /// The command run after `zfs snapshot` was finished.
    PostSnap,
    /// The command run prior to `zfs send` was started.
    PreSend,
    /// The command run after `zfs send` was finished.
    PostSend,
}

impl PipelineStage {
    /// All stages in pipeline order.
    pub const ALL: [PipelineStage; 4] = [
        PipelineStage::PreSnap,
        PipelineStage::PostSnap,
        PipelineStage::PreSend,
        PipelineStage::PostSend,
    ];

    /// Position of the stage in [`PipelineStage::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::PreSnap => 0,
            Self::PostSnap => 1,
            Self::PreSend => 2,
            Self::PostSend => 3,
        }
    }

    /// Whether series for this stage carry the `target_host` dimension.
    #[must_use]
    pub const fn is_host_scoped(self) -> bool {
        matches!(self, Self::PreSend | Self::PostSend)
    }

    /// Stable lowercase name used in URLs, logs and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreSnap => "presnap",
            Self::PostSnap => "postsnap",
            Self::PreSend => "presend",
            Self::PostSend => "postsend",
        }
    }

    /// Name of the query parameter that requests a reset of this stage.
    #[must_use]
    pub const fn reset_param(self) -> &'static str {
        match self {
            Self::PreSnap => "ResetPreSnap",
            Self::PostSnap => "ResetPostSnap",
            Self::PreSend => "ResetPreSend",
            Self::PostSend => "ResetPostSend",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResetFlags
// ─────────────────────────────────────────────────────────────────────────────

/// Per-stage "reset this stage" flags supplied with a stage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetFlags([bool; 4]);

impl ResetFlags {
    /// Flags with every stage cleared.
    #[must_use]
    pub const fn none() -> Self {
        Self([false; 4])
    }

    /// Flags with every stage set.
    #[must_use]
    pub const fn all() -> Self {
        Self([true; 4])
    }

    /// Returns a copy with the flag for `stage` set to `enabled`.
    #[must_use]
    pub const fn with(mut self, stage: PipelineStage, enabled: bool) -> Self {
        self.0[stage.index()] = enabled;
        self
    }

    /// Sets the flag for `stage`.
    pub fn set(&mut self, stage: PipelineStage, enabled: bool) {
        self.0[stage.index()] = enabled;
    }

    /// Whether a reset was requested for `stage`.
    #[must_use]
    pub const fn get(&self, stage: PipelineStage) -> bool {
        self.0[stage.index()]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JobKey
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies the gauges of one job: a label plus an optional target host.
///
/// The empty string is the canonical form of an absent target host, so
/// `JobKey::new("tank", Some(""))` and `JobKey::new("tank", None)` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    label: String,
    target_host: String,
}

impl JobKey {
    /// Builds a validated key.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::MissingJobLabel`] for an empty label and
    /// [`ExporterError::InvalidLabel`] when the label or host contains ASCII
    /// control characters.
    pub fn new(label: impl Into<String>, target_host: Option<&str>) -> Result<Self, ExporterError> {
        let label = label.into();
        if label.is_empty() {
            return Err(ExporterError::MissingJobLabel);
        }
        if label.chars().any(|c| c.is_control()) {
            return Err(ExporterError::InvalidLabel {
                field: "job",
                value: label.escape_default().to_string(),
            });
        }

        let target_host = target_host.unwrap_or_default();
        if target_host.chars().any(|c| c.is_control()) {
            return Err(ExporterError::InvalidLabel {
                field: "target_host",
                value: target_host.escape_default().to_string(),
            });
        }

        Ok(Self {
            label,
            target_host: target_host.to_string(),
        })
    }

    /// Key for a job without a target host.
    ///
    /// # Errors
    ///
    /// See [`JobKey::new`].
    pub fn job(label: impl Into<String>) -> Result<Self, ExporterError> {
        Self::new(label, None)
    }

    /// The job label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The target host, `None` when absent.
    #[must_use]
    pub fn target_host(&self) -> Option<&str> {
        if self.target_host.is_empty() {
            None
        } else {
            Some(&self.target_host)
        }
    }

    /// The target host in canonical form (empty when absent).
    #[must_use]
    pub fn target_host_label(&self) -> &str {
        &self.target_host
    }

    /// Same label with the target host dropped.
    #[must_use]
    pub fn without_host(&self) -> Self {
        Self {
            label: self.label.clone(),
            target_host: String::new(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_host() {
            Some(host) => write!(f, "{}@{}", self.label, host),
            None => f.write_str(&self.label),
        }
    }
}
