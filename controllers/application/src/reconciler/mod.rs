//! Reconciliation engine for `Application` resources.
//!
//! One pass re-reads the Application, marks it progressing, then walks the
//! kind registry in order. Each kind is created; if it already exists the
//! observed object is fetched and drift-checked, and a corrective update is
//! written only when drift was found. Any failed mutation marks the status
//! failed and aborts the pass so the watcher requeues it.
//!
//! Passes for one Application are serialized by the controller runtime, so
//! the engine holds no locks of its own.

pub mod status;

#[cfg(test)]
mod application_test;

use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::registry::{KindEntry, KindRegistry};
use cluster_client::{ClusterClientTrait, ClusterError, ManagedKind};
use crds::Specification;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use status::{StatusWrite, cancellable, write_status};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default delay before a failed pass is retried
pub const DEFAULT_REQUEUE_AFTER: Duration = Duration::from_secs(5);

/// What a pass does when a kind already exists without drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftScanPolicy {
    /// End the pass at the first converged kind. Later kinds are not
    /// inspected and the status is left as written at pass start.
    #[default]
    StopAtFirstConverged,
    /// Move on to the next kind and settle the status after the last one
    InspectAllKinds,
}

impl FromStr for DriftScanPolicy {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop-at-first-converged" => Ok(Self::StopAtFirstConverged),
            "inspect-all-kinds" => Ok(Self::InspectAllKinds),
            other => Err(ControllerError::InvalidConfig(format!(
                "unknown drift scan policy '{other}', expected 'stop-at-first-converged' or 'inspect-all-kinds'"
            ))),
        }
    }
}

/// Engine policy knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Delay before a failed pass is retried
    pub requeue_after: Duration,
    /// Whether a converged kind ends the pass
    pub drift_scan: DriftScanPolicy,
    /// Generate and reconcile an Ingress as well
    pub manage_ingress: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            requeue_after: DEFAULT_REQUEUE_AFTER,
            drift_scan: DriftScanPolicy::default(),
            manage_ingress: false,
        }
    }
}

/// How a pass ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The Application no longer exists
    SpecificationGone,
    /// Every kind reconciled, status settled
    Settled,
    /// Pass stopped at a kind that showed no drift
    StoppedAtConverged(ManagedKind),
    /// Cancellation fired at an I/O boundary; nothing more was written
    Cancelled,
}

impl PassOutcome {
    /// Label value used for the pass counter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpecificationGone => "specification_gone",
            Self::Settled => "settled",
            Self::StoppedAtConverged(_) => "stopped_at_converged",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of reconciling one kind
enum KindOutcome {
    Created,
    Corrected,
    Converged,
    Cancelled,
}

/// Reconciles Application resources against the cluster.
pub struct Reconciler {
    pub(crate) client: Arc<dyn ClusterClientTrait>,
    registry: KindRegistry,
    config: ReconcilerConfig,
    metrics: Arc<Metrics>,
}

impl Reconciler {
    /// Creates a reconciler with the standard kind registry for `config`.
    pub fn new(client: Arc<dyn ClusterClientTrait>, config: ReconcilerConfig, metrics: Arc<Metrics>) -> Self {
        let registry = KindRegistry::standard(config.manage_ingress);
        Self::with_registry(client, registry, config, metrics)
    }

    /// Creates a reconciler walking an explicit kind table.
    pub fn with_registry(
        client: Arc<dyn ClusterClientTrait>,
        registry: KindRegistry,
        config: ReconcilerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            client,
            registry,
            config,
            metrics,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Kinds reconciled on each pass, in order
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Runs one reconciliation pass for the Application `namespace/name`.
    pub async fn reconcile_application(
        &self,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, ControllerError> {
        let result = self.run_pass(namespace, name, cancel).await;
        match &result {
            Ok(outcome) => self.metrics.record_pass(outcome.as_str()),
            Err(_) => self.metrics.record_pass("failed"),
        }
        result
    }

    async fn run_pass(
        &self,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, ControllerError> {
        let client = self.client.as_ref();

        let app = match cancellable(cancel, client.get_application(namespace, name)).await {
            None => return Ok(PassOutcome::Cancelled),
            Some(Ok(app)) => app,
            Some(Err(ClusterError::NotFound(_))) => {
                debug!("Application {}/{} not found, nothing to reconcile", namespace, name);
                return Ok(PassOutcome::SpecificationGone);
            }
            Some(Err(e)) => {
                self.metrics.record_failure("fetch_application");
                return Err(ControllerError::FetchApplication(e));
            }
        };

        let spec = Specification::resolve(&app).map_err(|e| {
            error!("Cannot reconcile Application {}/{}: {}", namespace, name, e);
            ControllerError::from(e)
        })?;
        let owner = app.controller_owner_ref(&()).ok_or_else(|| {
            error!("Cannot build owner reference for Application {}/{}", namespace, name);
            ControllerError::InvariantViolation(format!("Application {namespace}/{name} has no name or uid"))
        })?;

        info!("Reconciling Application {}/{}", namespace, name);
        if write_status(client, namespace, name, &status::progressing(), cancel).await? == StatusWrite::Cancelled {
            return Ok(PassOutcome::Cancelled);
        }

        for entry in self.registry.entries() {
            let outcome = match self.reconcile_kind(entry, &spec, namespace, &owner, cancel).await {
                Ok(outcome) => outcome,
                Err(err) => return self.fail(namespace, name, err, cancel).await,
            };
            match outcome {
                KindOutcome::Cancelled => return Ok(PassOutcome::Cancelled),
                KindOutcome::Converged => match self.config.drift_scan {
                    DriftScanPolicy::StopAtFirstConverged => {
                        debug!("{} for {}/{} converged, ending pass", entry.kind, namespace, name);
                        return Ok(PassOutcome::StoppedAtConverged(entry.kind));
                    }
                    DriftScanPolicy::InspectAllKinds => {}
                },
                KindOutcome::Created | KindOutcome::Corrected => {}
            }
        }

        if write_status(client, namespace, name, &status::settled(), cancel).await? == StatusWrite::Cancelled {
            return Ok(PassOutcome::Cancelled);
        }
        info!("Application {}/{} reconciled", namespace, name);
        Ok(PassOutcome::Settled)
    }

    async fn reconcile_kind(
        &self,
        entry: &KindEntry,
        spec: &Specification,
        namespace: &str,
        owner: &OwnerReference,
        cancel: &CancellationToken,
    ) -> Result<KindOutcome, ControllerError> {
        let client = self.client.as_ref();
        let mut desired = (entry.generate)(spec);
        desired.set_namespace(namespace);
        desired.set_owner_reference(owner.clone());
        let key = desired.identity_key();

        match cancellable(cancel, client.create(&desired)).await {
            None => return Ok(KindOutcome::Cancelled),
            Some(Ok(_)) => {
                info!("Created {}", key);
                self.metrics.record_create(entry.kind.as_str());
                return Ok(KindOutcome::Created);
            }
            Some(Err(ClusterError::AlreadyExists(_))) => {}
            Some(Err(source)) => {
                self.metrics.record_failure("create");
                return Err(ControllerError::Create { key, source });
            }
        }

        let observed = match cancellable(cancel, client.get(key.kind, &key.namespace, &key.name)).await {
            None => return Ok(KindOutcome::Cancelled),
            Some(Ok(observed)) => observed,
            Some(Err(source)) => {
                self.metrics.record_failure("fetch");
                return Err(ControllerError::Fetch { key, source });
            }
        };

        if !(entry.detect_drift)(&desired, &observed) {
            debug!("{} has no drift", key);
            return Ok(KindOutcome::Converged);
        }

        info!("Drift detected on {}, issuing corrective update", key);
        let mut corrected = observed;
        (entry.apply_desired)(&desired, &mut corrected);

        match cancellable(cancel, client.update(&corrected)).await {
            None => Ok(KindOutcome::Cancelled),
            Some(Ok(_)) => {
                self.metrics.record_corrective_update(entry.kind.as_str());
                Ok(KindOutcome::Corrected)
            }
            Some(Err(source)) => {
                self.metrics.record_failure("update");
                Err(ControllerError::Update { key, source })
            }
        }
    }

    /// Marks the status failed (best effort) and returns `err` for requeue.
    async fn fail(
        &self,
        namespace: &str,
        name: &str,
        err: ControllerError,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, ControllerError> {
        error!("Reconciliation of {}/{} failed: {}", namespace, name, err);
        if cancel.is_cancelled() {
            return Ok(PassOutcome::Cancelled);
        }
        match write_status(self.client.as_ref(), namespace, name, &status::failed(&err), cancel).await {
            Ok(StatusWrite::Cancelled) => return Ok(PassOutcome::Cancelled),
            Ok(_) => {}
            Err(status_err) => warn!("Could not record failure on {}/{}: {}", namespace, name, status_err),
        }
        Err(err)
    }
}
