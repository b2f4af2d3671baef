//! Controller configuration from environment variables.

use crate::error::ControllerError;
use crate::reconciler::{DEFAULT_REQUEUE_AFTER, DriftScanPolicy, ReconcilerConfig};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8080";

/// Runtime configuration of the Application Controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Address of the probe and metrics server
    pub probe_addr: SocketAddr,
    pub reconciler: ReconcilerConfig,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let manage_ingress = match lookup("MANAGE_INGRESS") {
            None => false,
            Some(value) => parse_bool("MANAGE_INGRESS", &value)?,
        };

        let drift_scan = match lookup("DRIFT_SCAN_POLICY") {
            None => DriftScanPolicy::default(),
            Some(value) => value.parse()?,
        };

        let requeue_after = match lookup("REQUEUE_AFTER_SECONDS") {
            None => DEFAULT_REQUEUE_AFTER,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "REQUEUE_AFTER_SECONDS must be a positive integer, got '{value}'"
                    )));
                }
            },
        };

        let probe_addr = lookup("PROBE_ADDR").unwrap_or_else(|| DEFAULT_PROBE_ADDR.to_string());
        let probe_addr = probe_addr
            .parse()
            .map_err(|e| ControllerError::InvalidConfig(format!("PROBE_ADDR '{probe_addr}' is not a socket address: {e}")))?;

        Ok(Self {
            namespace,
            probe_addr,
            reconciler: ReconcilerConfig {
                requeue_after,
                drift_scan,
                manage_ingress,
            },
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ControllerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ControllerError::InvalidConfig(format!("{key} must be a boolean, got '{value}'"))),
    }
}
