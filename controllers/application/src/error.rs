//! Controller-specific error types.
//!
//! This module defines error types specific to the Application Controller
//! that are not covered by upstream library errors.

use cluster_client::{ClusterError, ObjectKey};
use crds::CrdError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Application Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client setup error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Fetching the Application failed for a reason other than not-found
    #[error("Failed to fetch Application: {0}")]
    FetchApplication(#[source] ClusterError),

    /// Creating a managed object failed
    #[error("Failed to create {key}: {source}")]
    Create {
        key: ObjectKey,
        #[source]
        source: ClusterError,
    },

    /// Fetching an existing managed object failed
    #[error("Failed to fetch {key}: {source}")]
    Fetch {
        key: ObjectKey,
        #[source]
        source: ClusterError,
    },

    /// Corrective update of a managed object failed
    #[error("Failed to update {key}: {source}")]
    Update {
        key: ObjectKey,
        #[source]
        source: ClusterError,
    },

    /// Writing the Application status failed
    #[error("Failed to write status: {0}")]
    Status(#[source] ClusterError),

    /// The Application cannot be reconciled as persisted (no UID yet)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Probe server failed
    #[error("Probe server error: {0}")]
    Probe(#[from] std::io::Error),

    /// Metric registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<CrdError> for ControllerError {
    fn from(err: CrdError) -> Self {
        Self::InvariantViolation(err.to_string())
    }
}

impl ControllerError {
    /// Whether the error policy should requeue after this error.
    ///
    /// Invariant violations wait for the resource to change instead.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}
