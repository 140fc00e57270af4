//! Command line and environment configuration.
//!
//! Every flag can also be set through its environment variable. Flags take
//! precedence over the environment, which takes precedence over defaults.

use std::net::SocketAddr;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};

use znapzend_exporter_core::config::{
    ConfigError, ExporterSettings, StartupJob, parse_duration,
};
use znapzend_exporter_core::lifecycle::LifecycleConfig;
use znapzend_exporter_core::telemetry::{DEFAULT_MAX_JOBS, DEFAULT_NAMESPACE};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Prometheus exporter for znapzend pre/post snapshot and send hooks.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on. `:8080` binds all interfaces.
    #[arg(long, env = "BINDADDR", default_value = ":8080", value_parser = parse_bind_addr)]
    pub bind_addr: SocketAddr,

    /// Log level or tracing filter directive (e.g. `debug`, `info,tower_http=debug`).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "LOG_FORMATTER", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Comma separated jobs to register at startup, `label` or `label@host`.
    #[arg(long, env = "JOBS_REGISTER", default_value = "")]
    pub jobs_register: String,

    /// Prefix for every exported metric name.
    #[arg(long, env = "METRICS_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Key send-stage gauges by target host.
    #[arg(
        long,
        env = "HOST_AWARE",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub host_aware: bool,

    /// Maximum distinct job labels, 0 for unlimited.
    #[arg(long, env = "MAX_JOBS", default_value_t = DEFAULT_MAX_JOBS)]
    pub max_jobs: usize,

    /// How long in-flight requests may take after SIGINT/SIGTERM.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value = "10s", value_parser = parse_duration_arg)]
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Validated engine settings.
    ///
    /// # Errors
    ///
    /// Fails for a malformed startup job list or metric namespace.
    pub fn exporter_settings(&self) -> Result<ExporterSettings, ConfigError> {
        let settings = ExporterSettings {
            namespace: self.namespace.clone(),
            host_aware: self.host_aware,
            max_jobs: self.max_jobs,
            startup_jobs: StartupJob::parse_list(&self.jobs_register)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Lifecycle settings.
    #[must_use]
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

/// Parse a listen address, accepting the `:port` shorthand.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBindAddr`] when the value is not a socket address.
pub fn parse_bind_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    let normalized = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => value.to_string(),
    };
    normalized
        .parse()
        .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBindAddr {
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn parse_duration_arg(value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).map_err(|message| ConfigError::InvalidDuration {
        setting: "shutdown-timeout".to_string(),
        message,
    })
}
