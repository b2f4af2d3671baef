//! Listener setup and graceful shutdown.

use crate::error::DemoServerError;
use crate::http::router;
use std::net::SocketAddr;
use tracing::info;

/// Listen address when `DEMO_SERVER_ADDR` is unset
pub const DEFAULT_ADDR: &str = "0.0.0.0:8081";

/// Demo server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Reads `DEMO_SERVER_ADDR`, defaulting to `0.0.0.0:8081`.
    pub fn from_env() -> Result<Self, DemoServerError> {
        Self::from_addr(std::env::var("DEMO_SERVER_ADDR").ok().as_deref())
    }

    /// Parses `addr`, falling back to [`DEFAULT_ADDR`].
    pub fn from_addr(addr: Option<&str>) -> Result<Self, DemoServerError> {
        let raw = addr.unwrap_or(DEFAULT_ADDR);
        let addr = raw
            .parse()
            .map_err(|e| DemoServerError::Configuration(format!("'{raw}' is not a socket address: {e}")))?;
        Ok(Self { addr })
    }
}

/// Serves the demo router until ctrl-c.
pub async fn run(config: ServerConfig) -> Result<(), DemoServerError> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Demo server listening on {}", listener.local_addr()?);

    axum::serve(listener, router().into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;
    Ok(())
}
