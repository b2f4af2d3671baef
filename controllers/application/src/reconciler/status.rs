//! Application status transitions and the guarded status write.

use crate::error::ControllerError;
use cluster_client::{ClusterClientTrait, ClusterError};
use crds::ApplicationStatus;
use std::fmt::Display;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const REASON_PROGRESSING: &str = "reconciling cluster state";
pub const REASON_COMPLETED: &str = "completed";
pub const REASON_FAILED_PREFIX: &str = "failed to reconcile cluster state due to error";

/// Status written before any mutation
pub fn progressing() -> ApplicationStatus {
    ApplicationStatus {
        progressing: true,
        reason: REASON_PROGRESSING.to_string(),
    }
}

/// Status written once every kind has been reconciled
pub fn settled() -> ApplicationStatus {
    ApplicationStatus {
        progressing: false,
        reason: REASON_COMPLETED.to_string(),
    }
}

/// Status written when a pass aborts on `err`
pub fn failed(err: &impl Display) -> ApplicationStatus {
    ApplicationStatus {
        progressing: false,
        reason: format!("{REASON_FAILED_PREFIX}: {err}"),
    }
}

/// What happened to a requested status write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWrite {
    Written,
    /// Stored status already equal, nothing sent
    Unchanged,
    /// Application deleted before the write
    ApplicationGone,
    /// Conflict or throttling, left to the next event
    Contended,
    Cancelled,
}

/// Runs `fut` unless `cancel` fires first.
pub async fn cancellable<T>(cancel: &CancellationToken, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

/// Writes `desired` to the Application's status subresource.
///
/// The Application is read first and the write skipped when the stored
/// status already matches, so status writes never retrigger the watch.
/// Contention is swallowed; any other failure is returned.
pub async fn write_status(
    client: &dyn ClusterClientTrait,
    namespace: &str,
    name: &str,
    desired: &ApplicationStatus,
    cancel: &CancellationToken,
) -> Result<StatusWrite, ControllerError> {
    let current = match cancellable(cancel, client.get_application(namespace, name)).await {
        None => return Ok(StatusWrite::Cancelled),
        Some(Ok(app)) => app,
        Some(Err(ClusterError::NotFound(_))) => {
            debug!("Application {}/{} gone before status write", namespace, name);
            return Ok(StatusWrite::ApplicationGone);
        }
        Some(Err(e)) if e.is_contention() => {
            warn!("Status read for {}/{} contended: {}", namespace, name, e);
            return Ok(StatusWrite::Contended);
        }
        Some(Err(e)) => return Err(ControllerError::Status(e)),
    };

    if current.status.as_ref() == Some(desired) {
        debug!("Status of {}/{} unchanged, skipping write", namespace, name);
        return Ok(StatusWrite::Unchanged);
    }

    match cancellable(cancel, client.update_application_status(namespace, name, desired)).await {
        None => Ok(StatusWrite::Cancelled),
        Some(Ok(())) => Ok(StatusWrite::Written),
        Some(Err(ClusterError::NotFound(_))) => Ok(StatusWrite::ApplicationGone),
        Some(Err(e)) if e.is_contention() => {
            warn!("Status write for {}/{} contended, leaving it to the next event: {}", namespace, name, e);
            Ok(StatusWrite::Contended)
        }
        Some(Err(e)) => Err(ControllerError::Status(e)),
    }
}
