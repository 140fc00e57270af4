//! znapzend exporter: Prometheus gauges for znapzend pre/post snapshot and
//! send hooks.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use clap::Parser;
use prometheus_client::registry::Registry;
use tracing::{error, info};

use znapzend_exporter::cli::Config;
use znapzend_exporter::logging::init_logging;
use znapzend_exporter::server::{AppState, ExporterServer};
use znapzend_exporter_core::StageService;
use znapzend_exporter_core::config::format_duration;
use znapzend_exporter_core::lifecycle::LifecycleManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    // Held until exit so buffered log lines are flushed
    let _guard = init_logging(&config.log_level, config.log_format);

    let settings = config.exporter_settings().inspect_err(|e| {
        error!(error = %e, "Invalid configuration, refusing to start");
    })?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %config.bind_addr,
        namespace = %settings.namespace,
        host_aware = settings.host_aware,
        max_jobs = settings.max_jobs,
        shutdown_timeout = %format_duration(config.shutdown_timeout),
        "Starting znapzend exporter"
    );

    let lifecycle = Arc::new(LifecycleManager::new(config.lifecycle_config()));

    let mut registry = Registry::default();
    let service = StageService::new(&mut registry, &settings);
    lifecycle.mark_registry_initialized();

    service.register_startup_jobs(&settings.startup_jobs);
    lifecycle.mark_startup_jobs_registered();

    setup_signal_handlers(Arc::clone(&lifecycle));

    let state = AppState {
        service,
        lifecycle: Arc::clone(&lifecycle),
        registry: Arc::new(registry),
    };
    let result = ExporterServer::new(config.bind_addr, state).run().await;
    lifecycle.mark_stopped();

    result.inspect_err(|e| error!(error = %e, "HTTP server failed"))?;
    Ok(())
}

/// SIGINT and SIGTERM both begin a graceful shutdown.
fn setup_signal_handlers(lifecycle: Arc<LifecycleManager>) {
    let lifecycle_sigint = Arc::clone(&lifecycle);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT, initiating graceful shutdown");
                lifecycle_sigint.begin_shutdown();
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGINT"),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown");
                lifecycle.begin_shutdown();
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
        }
    });

    #[cfg(not(unix))]
    let _ = lifecycle;
}
