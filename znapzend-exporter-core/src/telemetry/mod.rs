//! Prometheus gauges for the pipeline stages.
//!
//! - [`gauges`] - the four stage families and their store
//! - `series_index` - job/host bookkeeping and the series limit

pub mod gauges;
mod series_index;

pub use gauges::{
    DEFAULT_MAX_JOBS, DEFAULT_NAMESPACE, GaugeStore, JobLabels, SendLabels, StoreSettings,
};
