//! Configuration error types.

use thiserror::Error;

/// Errors raised while turning raw settings into [`ExporterSettings`](super::ExporterSettings).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An entry of the startup job list is malformed.
    #[error("invalid startup job '{entry}': {reason}")]
    InvalidStartupJob { entry: String, reason: String },

    /// A duration setting could not be parsed.
    #[error("invalid duration for {setting}: {message}")]
    InvalidDuration { setting: String, message: String },

    /// The listen address is not a socket address.
    #[error("invalid bind address '{value}': {message}")]
    InvalidBindAddr { value: String, message: String },

    /// The metric namespace is not a valid metric name prefix.
    #[error("invalid metrics namespace '{value}': must match [a-zA-Z_][a-zA-Z0-9_]*")]
    InvalidNamespace { value: String },
}
