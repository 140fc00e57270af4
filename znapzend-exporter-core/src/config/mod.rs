//! Settings consumed by the stage-gauge engine.
//!
//! The binary collects raw values from CLI flags and environment variables;
//! this module validates them into [`ExporterSettings`].

pub mod duration_format;
mod error;

pub use duration_format::{format_duration, parse_duration};
pub use error::ConfigError;

use std::fmt;

use crate::stage::JobKey;
use crate::telemetry::{DEFAULT_MAX_JOBS, DEFAULT_NAMESPACE, StoreSettings};

/// A job registered before the server starts accepting requests.
///
/// Written as `label` or `label@host`. The host part primes send-stage
/// series for that destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupJob {
    pub label: String,
    pub target_host: Option<String>,
}

impl StartupJob {
    /// Parse one `label[@host]` entry.
    ///
    /// The label may itself contain `@`; only the last one separates the host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStartupJob`] for an empty label or host,
    /// or a label that [`JobKey`] rejects.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let entry = entry.trim();
        let invalid = |reason: &str| ConfigError::InvalidStartupJob {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (label, target_host) = match entry.rsplit_once('@') {
            Some((_, host)) if host.is_empty() => return Err(invalid("empty target host")),
            Some((label, host)) => (label, Some(host.to_string())),
            None => (entry, None),
        };
        let label = label.trim_start_matches('/');

        JobKey::new(label, target_host.as_deref()).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            label: label.to_string(),
            target_host,
        })
    }

    /// Parse a comma separated list, skipping empty entries.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed entry.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ConfigError> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for StartupJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target_host {
            Some(host) => write!(f, "{}@{}", self.label, host),
            None => f.write_str(&self.label),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterSettings {
    /// Metric name prefix (default: `znapzend`)
    pub namespace: String,
    /// Whether send stages are keyed by target host (default: true)
    pub host_aware: bool,
    /// Maximum distinct job labels, 0 for unlimited (default: 1000)
    pub max_jobs: usize,
    /// Jobs registered at startup
    pub startup_jobs: Vec<StartupJob>,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            host_aware: true,
            max_jobs: DEFAULT_MAX_JOBS,
            startup_jobs: Vec::new(),
        }
    }
}

impl ExporterSettings {
    /// Check values that would otherwise fail deep inside the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNamespace`] when the namespace is not a
    /// valid metric name prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut chars = self.namespace.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidNamespace {
                value: self.namespace.clone(),
            })
        }
    }

    /// Settings for the gauge store.
    #[must_use]
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            namespace: self.namespace.clone(),
            max_jobs: self.max_jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_label() {
        let job = StartupJob::parse("pool").unwrap();
        assert_eq!(job.label, "pool");
        assert_eq!(job.target_host, None);
    }

    #[test]
    fn test_parse_label_with_host() {
        let job = StartupJob::parse("tank/backup@backup01").unwrap();
        assert_eq!(job.label, "tank/backup");
        assert_eq!(job.target_host.as_deref(), Some("backup01"));
        assert_eq!(job.to_string(), "tank/backup@backup01");
    }

    #[test]
    fn test_parse_strips_leading_slash() {
        assert_eq!(StartupJob::parse("/tank").unwrap().label, "tank");
    }

    #[test]
    fn test_parse_rejects_empty_parts() {
        assert!(StartupJob::parse("@backup01").is_err());
        assert!(StartupJob::parse("pool@").is_err());
        assert!(StartupJob::parse("/").is_err());
    }

    #[test]
    fn test_parse_list() {
        let jobs = StartupJob::parse_list("pool, tank@hostA,,").unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].label, "pool");
        assert_eq!(jobs[1].target_host.as_deref(), Some("hostA"));

        assert!(StartupJob::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_reports_bad_entry() {
        let err = StartupJob::parse_list("pool,@x").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStartupJob { entry, .. } if entry == "@x"));
    }

    #[test]
    fn test_defaults() {
        let settings = ExporterSettings::default();
        assert_eq!(settings.namespace, "znapzend");
        assert!(settings.host_aware);
        assert_eq!(settings.max_jobs, 1000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_namespace_validation() {
        let mut settings = ExporterSettings::default();
        for ok in ["backup", "_zfs", "zfs_2"] {
            settings.namespace = ok.to_string();
            assert!(settings.validate().is_ok(), "{ok}");
        }
        for bad in ["", "2fast", "zfs-backup", "a b"] {
            settings.namespace = bad.to_string();
            assert!(settings.validate().is_err(), "{bad}");
        }
    }
}
