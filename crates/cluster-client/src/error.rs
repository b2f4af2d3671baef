//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when talking to the cluster API.
///
/// Kubernetes API responses are classified by status code so the
/// reconciler can tell expected signals (already exists, contention) from
/// real failures.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Object does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object already exists (HTTP 409, reason AlreadyExists)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic concurrency conflict (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// API server throttled the request (HTTP 429)
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// Any other API error response
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Server supplied message
        message: String,
    },

    /// Transport or client-side error
    #[error("Kubernetes client error: {0}")]
    Kube(kube::Error),

    /// Object is missing data required for the request (name, namespace)
    #[error("Invalid object: {0}")]
    InvalidObject(String),
}

impl ClusterError {
    /// Expected contention with another writer: conflict or throttling
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::TooManyRequests(_))
    }

    /// Object (or Application) is gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Create hit an existing object
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => match ae.code {
                404 => Self::NotFound(ae.message.clone()),
                409 if ae.reason == "AlreadyExists" => Self::AlreadyExists(ae.message.clone()),
                409 => Self::Conflict(ae.message.clone()),
                429 => Self::TooManyRequests(ae.message.clone()),
                code => Self::Api {
                    code,
                    message: ae.message.clone(),
                },
            },
            other => Self::Kube(other),
        }
    }
}
