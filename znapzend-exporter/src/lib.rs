//! znapzend exporter HTTP service.
//!
//! This crate contains the HTTP boundary (routing, query decoding, JSON
//! responses), CLI configuration, logging setup and graceful shutdown. The
//! gauge state itself lives in `znapzend-exporter-core`.

pub mod cli;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod logging_layer;
pub mod params;
pub mod server;
