//! Query-parameter decoding for stage reports.
//!
//! | Parameter | Type | Default |
//! |-----------|------|---------|
//! | `ResetPreSnap` .. `ResetPostSend` | boolean | `true` |
//! | `SelfResetAfter` | duration | `0` (never; negative values too) |
//! | `TargetHost` | string | absent |
//!
//! Booleans accept `1 t T TRUE true True` and `0 f F FALSE false False`.
//! A present but empty boolean means `false` and an empty duration means `0`.

use std::time::Duration;

use serde::Deserialize;

use znapzend_exporter_core::config::parse_duration;
use znapzend_exporter_core::{ExporterError, ExporterResult, PipelineStage, ResetFlags, StageReport};

/// Raw query parameters of a stage, register, or unregister request.
#[derive(Debug, Default, Deserialize)]
pub struct StageQuery {
    /// Zero the pre-snapshot gauge
    #[serde(rename = "ResetPreSnap")]
    pub reset_pre_snap: Option<String>,
    /// Zero the post-snapshot gauge
    #[serde(rename = "ResetPostSnap")]
    pub reset_post_snap: Option<String>,
    /// Zero the pre-send gauge
    #[serde(rename = "ResetPreSend")]
    pub reset_pre_send: Option<String>,
    /// Zero the post-send gauge
    #[serde(rename = "ResetPostSend")]
    pub reset_post_send: Option<String>,
    /// Delay before the entered gauge drops back to 0
    #[serde(rename = "SelfResetAfter")]
    pub self_reset_after: Option<String>,
    /// Send destination
    #[serde(rename = "TargetHost")]
    pub target_host: Option<String>,
}

impl StageQuery {
    fn raw_flag(&self, stage: PipelineStage) -> Option<&str> {
        match stage {
            PipelineStage::PreSnap => self.reset_pre_snap.as_deref(),
            PipelineStage::PostSnap => self.reset_post_snap.as_deref(),
            PipelineStage::PreSend => self.reset_pre_send.as_deref(),
            PipelineStage::PostSend => self.reset_post_send.as_deref(),
        }
    }

    /// Reset flags, every stage defaulting to `true`.
    ///
    /// # Errors
    ///
    /// [`ExporterError::InvalidFlag`] for an unrecognised boolean.
    pub fn reset_flags(&self) -> ExporterResult<ResetFlags> {
        let mut flags = ResetFlags::all();
        for stage in PipelineStage::ALL {
            if let Some(raw) = self.raw_flag(stage) {
                flags.set(stage, parse_flag(stage.reset_param(), raw)?);
            }
        }
        Ok(flags)
    }

    /// Self-reset delay, zero when absent.
    ///
    /// A well-formed negative delay such as `-5s` also means no self-reset.
    ///
    /// # Errors
    ///
    /// [`ExporterError::InvalidDuration`] for an unparseable value.
    pub fn self_reset_after(&self) -> ExporterResult<Duration> {
        let raw = match self.self_reset_after.as_deref().map(str::trim) {
            None | Some("") => return Ok(Duration::ZERO),
            Some(raw) => raw,
        };
        let parsed = match raw.strip_prefix('-') {
            Some(magnitude) => parse_duration(magnitude).map(|_| Duration::ZERO),
            None => parse_duration(raw),
        };
        parsed.map_err(|reason| ExporterError::InvalidDuration {
            param: "SelfResetAfter".to_string(),
            value: raw.to_string(),
            reason,
        })
    }

    /// Target host, `None` when absent or empty.
    #[must_use]
    pub fn target_host(&self) -> Option<&str> {
        self.target_host.as_deref().filter(|host| !host.is_empty())
    }

    /// Build a stage report for `stage` on the job at `path`.
    ///
    /// Every parameter is validated before anything is returned, so a failed
    /// decode never reaches the gauges.
    ///
    /// # Errors
    ///
    /// Label, flag and duration errors.
    pub fn into_report(self, stage: PipelineStage, path: &str) -> ExporterResult<StageReport> {
        let label = job_label(path)?;
        let reset_flags = self.reset_flags()?;
        let self_reset_after = self.self_reset_after()?;
        Ok(StageReport {
            stage,
            label,
            target_host: self.target_host().map(str::to_string),
            reset_flags,
            self_reset_after,
        })
    }
}

/// Job label from the captured URL path, without leading slashes.
///
/// # Errors
///
/// [`ExporterError::MissingJobLabel`] when nothing remains.
pub fn job_label(path: &str) -> ExporterResult<String> {
    let label = path.trim_start_matches('/');
    if label.is_empty() {
        return Err(ExporterError::MissingJobLabel);
    }
    Ok(label.to_string())
}

/// Parse a boolean the way Go's `strconv.ParseBool` does. Empty means `false`.
///
/// # Errors
///
/// [`ExporterError::InvalidFlag`] for anything else.
pub fn parse_flag(param: &str, value: &str) -> ExporterResult<bool> {
    match value {
        "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        _ => Err(ExporterError::InvalidFlag {
            param: param.to_string(),
            value: value.to_string(),
        }),
    }
}
