//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7 for container health
//! checks and Prometheus scraping. Readiness drops while shutting down,
//! after a failed cycle or while the observation store is unreachable, and
//! recovers once the next cycle succeeds against a healthy store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::prometheus::MetricsRegistry;

/// Shared health state updated by the supervisor.
#[derive(Debug)]
pub struct HealthState {
    /// Whether the last cycle produced a report.
    last_cycle_ok: AtomicBool,
    /// Whether the observation sink answered its last health check.
    sink_ok: AtomicBool,
    /// Whether shutdown has been requested.
    shutting_down: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (ready by default).
    pub const fn new() -> Self {
        Self {
            last_cycle_ok: AtomicBool::new(true),
            sink_ok: AtomicBool::new(true),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Record the outcome of the latest cycle.
    pub fn set_last_cycle_ok(&self, ok: bool) {
        self.last_cycle_ok.store(ok, Ordering::Relaxed);
    }

    /// Record the outcome of the latest sink health check.
    pub fn set_sink_ok(&self, ok: bool) {
        self.sink_ok.store(ok, Ordering::Relaxed);
    }

    /// Flag that the process is draining.
    pub fn mark_shutting_down(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
    }

    /// Check if the service should receive traffic / be considered healthy.
    pub fn is_ready(&self) -> bool {
        self.last_cycle_ok.load(Ordering::Relaxed)
            && self.sink_ok.load(Ordering::Relaxed)
            && !self.shutting_down.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
struct AppState {
    health: Arc<HealthState>,
    metrics: Arc<MetricsRegistry>,
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    health: Arc<HealthState>,
    metrics: Arc<MetricsRegistry>,
    bind_address: String,
}

impl HealthServer {
    /// Create a new health server.
    pub const fn new(health: Arc<HealthState>, metrics: Arc<MetricsRegistry>, bind_address: String) -> Self {
        Self {
            health,
            metrics,
            bind_address,
        }
    }

    /// Router serving /live, /ready and /metrics.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/live", get(liveness))
            .route("/ready", get(readiness))
            .route("/metrics", get(metrics))
            .with_state(AppState {
                health: Arc::clone(&self.health),
                metrics: Arc::clone(&self.metrics),
            })
    }

    /// Serve until `shutdown` flips to `true`.
    #[instrument(skip(self, shutdown), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.bind_address).await?;

        info!("Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        Ok(())
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: 200 unless draining, the last cycle failed or the sink is down.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.health.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
