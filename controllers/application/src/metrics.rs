//! Prometheus metrics and the probe endpoint.
//!
//! `/healthz` answers as long as the process serves HTTP, `/readyz` once the
//! Application watcher is running, and `/metrics` exports the registry in
//! the Prometheus text format.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Reconciliation counters
pub struct Metrics {
    /// Finished passes by outcome
    pub passes_total: IntCounterVec,
    /// Objects created by kind
    pub creates_total: IntCounterVec,
    /// Corrective updates by kind
    pub corrective_updates_total: IntCounterVec,
    /// Failed passes by stage
    pub failures_total: IntCounterVec,
}

impl Metrics {
    /// Create and register the counters
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let passes_total = IntCounterVec::new(
            Opts::new("application_reconcile_passes_total", "Reconciliation passes by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(passes_total.clone()))?;

        let creates_total = IntCounterVec::new(
            Opts::new("application_objects_created_total", "Managed objects created"),
            &["kind"],
        )?;
        registry.register(Box::new(creates_total.clone()))?;

        let corrective_updates_total = IntCounterVec::new(
            Opts::new("application_corrective_updates_total", "Corrective updates issued after drift"),
            &["kind"],
        )?;
        registry.register(Box::new(corrective_updates_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new("application_reconcile_failures_total", "Failed reconciliation passes"),
            &["stage"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        Ok(Self {
            passes_total,
            creates_total,
            corrective_updates_total,
            failures_total,
        })
    }

    pub fn record_pass(&self, outcome: &str) {
        self.passes_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_create(&self, kind: &str) {
        self.creates_total.with_label_values(&[kind]).inc();
    }

    pub fn record_corrective_update(&self, kind: &str) {
        self.corrective_updates_total.with_label_values(&[kind]).inc();
    }

    pub fn record_failure(&self, stage: &str) {
        self.failures_total.with_label_values(&[stage]).inc();
    }
}

/// Export metrics in Prometheus text format
pub fn export_metrics(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Shared state of the probe endpoint
#[derive(Clone)]
pub struct ProbeState {
    pub registry: Arc<Registry>,
    pub ready: Arc<AtomicBool>,
}

impl ProbeState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }
}

async fn readyz(State(state): State<ProbeState>) -> Response {
    if state.ready.load(Ordering::Acquire) {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics_handler(State(state): State<ProbeState>) -> Response {
    match export_metrics(&state.registry) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Router for `/healthz`, `/readyz` and `/metrics`
pub fn probe_router(state: ProbeState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serves the probe router until `shutdown` fires.
pub async fn serve_probes(addr: SocketAddr, state: ProbeState, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Probe server listening on {}", addr);
    axum::serve(listener, probe_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
