//! HTTP server for stage reports, probes and scrapes.
//!
//! # Endpoints
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET/POST | `/presnap/{*job}` .. `/postsend/{*job}` | stage reports |
//! | GET/POST | `/register/{*job}`, `/unregister/{*job}` | job registration |
//! | GET | `/metrics` | OpenMetrics exposition |
//! | GET | `/health/alive`, `/health/ready` | probes |
//! | GET | `/` | banner |

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tracing::{info, warn};

use znapzend_exporter_core::StageService;
use znapzend_exporter_core::lifecycle::{LifecycleManager, health_router};

use crate::handlers;
use crate::logging_layer::{logging_layer, quiet_logging_layer};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Stage-gauge engine
    pub service: StageService,
    /// Lifecycle manager for probes and shutdown
    pub lifecycle: Arc<LifecycleManager>,
    /// Registry holding the stage gauges
    pub registry: Arc<Registry>,
}

/// Build the complete router.
pub fn router(state: AppState) -> Router {
    let lifecycle = Arc::clone(&state.lifecycle);

    let api = Router::new()
        .route("/", get(handlers::root))
        .merge(operation("presnap", handlers::presnap))
        .merge(operation("postsnap", handlers::postsnap))
        .merge(operation("presend", handlers::presend))
        .merge(operation("postsend", handlers::postsend))
        .merge(operation("register", handlers::register))
        .merge(operation("unregister", handlers::unregister))
        .fallback(handlers::not_found)
        .with_state(state.clone())
        .layer(logging_layer());

    let probes = Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .merge(health_router(lifecycle))
        .layer(quiet_logging_layer());

    api.merge(probes)
}

/// `GET`/`POST /{name}/{*job}`. Job-less forms fall through to the fallback,
/// which answers them with a missing-job error.
fn operation<H, T>(name: &str, handler: H) -> Router<AppState>
where
    H: axum::handler::Handler<T, AppState>,
    T: 'static,
{
    Router::new().route(
        &format!("/{name}/{{*job}}"),
        get(handler.clone()).post(handler),
    )
}

/// The exporter's HTTP server.
pub struct ExporterServer {
    bind_addr: SocketAddr,
    state: AppState,
}

impl ExporterServer {
    /// Create a server that will listen on `bind_addr`.
    pub fn new(bind_addr: SocketAddr, state: AppState) -> Self {
        Self { bind_addr, state }
    }

    /// Bind, mark the lifecycle ready and serve until the shutdown token is
    /// cancelled.
    ///
    /// In-flight requests get the configured shutdown timeout to finish;
    /// remaining connections are dropped after that.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or serving fails.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let lifecycle = Arc::clone(&self.state.lifecycle);
        let shutdown = lifecycle.shutdown_token();
        let shutdown_timeout = lifecycle.shutdown_timeout();

        info!(addr = %local_addr, "Exporter listening");
        lifecycle.mark_ready();

        let graceful = shutdown.clone();
        let server = axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                graceful.cancelled().await;
                info!("HTTP server shutting down");
            })
            .into_future();

        tokio::select! {
            result = server => result,
            () = async {
                shutdown.cancelled().await;
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                warn!(
                    shutdown_timeout_secs = shutdown_timeout.as_secs(),
                    "Shutdown timeout elapsed, dropping open connections"
                );
                Ok(())
            }
        }
    }
}
