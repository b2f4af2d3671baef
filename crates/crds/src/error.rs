//! CRD errors

use thiserror::Error;

/// Errors raised while reading an `Application` resource.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrdError {
    /// The cluster has not assigned a UID yet, so no instance token exists.
    /// Only persisted resources may be resolved.
    #[error("Application {0} has no cluster-assigned UID")]
    MissingUid(String),
}
