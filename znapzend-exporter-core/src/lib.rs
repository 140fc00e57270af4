//! znapzend exporter core: the stage-gauge state engine.
//!
//! Pipeline hooks report that a backup job entered one of four stages
//! (pre/post snapshot, pre/post send). Each report sets that stage's gauge
//! to 1, optionally zeroes the job's other stages, and may schedule the
//! gauge to fall back to 0 after a delay. The gauges live in a
//! `prometheus_client` registry that the binary exposes on `/metrics`.
//!
//! The HTTP boundary lives in the `znapzend-exporter` crate; everything here
//! is transport-agnostic.

pub mod config;
pub mod error;
pub mod expiry;
pub mod jobs;
pub mod lifecycle;
pub mod service;
pub mod stage;
pub mod telemetry;
pub mod transition;

pub use error::{ExporterError, ExporterResult};
pub use service::{StageReport, StageService};
pub use stage::{JobKey, PipelineStage, ResetFlags};
