//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the reconciler to
//! the Kubernetes client, the Application watcher and the probe server.

use crate::config::Config;
use crate::error::ControllerError;
use crate::metrics::{Metrics, ProbeState, serve_probes};
use crate::reconciler::Reconciler;
use crate::watcher::{Context, watch_applications};
use cluster_client::KubeClusterClient;
use kube::Client;
use prometheus::Registry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main controller for Application management.
pub struct Controller {
    application_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<std::io::Result<()>>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Application Controller");

        let kube_client = Client::try_default().await?;

        let registry = Registry::new();
        let metrics = Arc::new(Metrics::new(&registry)?);
        let probe_state = ProbeState::new(Arc::new(registry));

        let reconciler = Reconciler::new(
            Arc::new(KubeClusterClient::new(kube_client.clone())),
            config.reconciler.clone(),
            metrics,
        );

        let shutdown = CancellationToken::new();
        let ctx = Arc::new(Context {
            reconciler,
            shutdown: shutdown.clone(),
        });

        let probe_server = tokio::spawn(serve_probes(config.probe_addr, probe_state.clone(), shutdown.clone()));

        let signal_shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => signal_shutdown.cancel(),
                _ = signal_shutdown.cancelled() => {}
            }
        });

        let watcher_shutdown = shutdown.clone();
        let namespace = config.namespace.clone();
        let application_watcher = tokio::spawn(async move {
            probe_state.set_ready(true);
            let result = watch_applications(kube_client, namespace, ctx).await;
            probe_state.set_ready(false);
            watcher_shutdown.cancel();
            result
        });

        Ok(Self {
            application_watcher,
            probe_server,
            shutdown,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Application Controller running");

        tokio::select! {
            result = &mut self.application_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Application watcher panicked: {}", e)))??;
            }
            result = &mut self.probe_server => {
                self.shutdown.cancel();
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
                return Err(ControllerError::Watch("Probe server exited".to_string()));
            }
        }

        // Watcher finished; let the probe server drain
        if let Err(e) = self.probe_server.await {
            return Err(ControllerError::Watch(format!("Probe server panicked: {}", e)));
        }
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, cancelling in-flight passes"),
        _ = terminate => info!("Received terminate signal, cancelling in-flight passes"),
    }
}
