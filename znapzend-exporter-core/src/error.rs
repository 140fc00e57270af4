//! Error types for the stage-gauge engine.
//!
//! Two kinds of failure exist:
//!
//! - **Invalid input** (`is_client_error() == true`): the request is rejected
//!   before any gauge is touched.
//! - **Store failure**: the request fails for that one label; every other
//!   label keeps its state.
//!
//! Unknown labels are never an error. Resetting or unregistering a label that
//! was never seen succeeds as a no-op.

use thiserror::Error;

use crate::stage::PipelineStage;

/// All errors that can occur while handling a stage report or registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExporterError {
    /// The request carried no job label.
    #[error("missing Job name in URL")]
    MissingJobLabel,

    /// A label value cannot be used as a series label.
    #[error("invalid {field} label '{value}': control characters are not allowed")]
    InvalidLabel {
        /// Which label was rejected ("job" or "target_host")
        field: &'static str,
        /// The offending value, escaped
        value: String,
    },

    /// A host-scoped stage was reported without a target host.
    #[error("missing TargetHost parameter in query for stage {stage}")]
    MissingTargetHost {
        /// The stage that requires a host
        stage: PipelineStage,
    },

    /// A boolean query parameter could not be parsed.
    #[error("invalid boolean '{value}' for parameter {param}")]
    InvalidFlag {
        /// Parameter name
        param: String,
        /// The raw value
        value: String,
    },

    /// A duration query parameter could not be parsed.
    #[error("invalid duration '{value}' for parameter {param}: {reason}")]
    InvalidDuration {
        /// Parameter name
        param: String,
        /// The raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// Creating series for a new job would exceed the configured limit.
    #[error("series limit of {limit} jobs reached, cannot create series for job '{job}'")]
    SeriesLimitExceeded {
        /// The job label that was refused
        job: String,
        /// Configured maximum number of jobs
        limit: usize,
    },
}

impl ExporterError {
    /// Machine-readable error name for logs and responses.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MissingJobLabel => "missing_job_label",
            Self::InvalidLabel { .. } => "invalid_label",
            Self::MissingTargetHost { .. } => "missing_target_host",
            Self::InvalidFlag { .. } => "invalid_flag",
            Self::InvalidDuration { .. } => "invalid_duration",
            Self::SeriesLimitExceeded { .. } => "series_limit_exceeded",
        }
    }

    /// Whether the error is caused by caller input rather than store state.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::SeriesLimitExceeded { .. })
    }
}

/// Result alias for engine operations.
pub type ExporterResult<T> = Result<T, ExporterError>;
