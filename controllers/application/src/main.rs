//! Application Controller
//!
//! Converges `Application` custom resources into a Deployment, a Service, a
//! ServiceAccount and optionally an Ingress, correcting drift on the fields
//! it owns and reporting progress in the Application's status.

mod config;
mod controller;
mod correction;
mod drift;
mod error;
mod generators;
mod metrics;
mod reconciler;
mod registry;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube is built with rustls; pick the ring provider before any client exists
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        info!("rustls crypto provider already installed");
    }

    info!("Starting Application Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Probe address: {}", config.probe_addr);
    info!("  Manage ingress: {}", config.reconciler.manage_ingress);
    info!("  Drift scan policy: {:?}", config.reconciler.drift_scan);
    info!("  Requeue after: {:?}", config.reconciler.requeue_after);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
