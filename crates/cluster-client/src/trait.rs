//! ClusterClient trait for mocking
//!
//! This trait abstracts the cluster API so the reconciler can be exercised
//! against an in-memory store. `KubeClusterClient` implements it over the
//! real API server.

use crate::error::ClusterError;
use crate::object::{ManagedKind, ManagedObject};
use crds::{Application, ApplicationStatus};

/// Cluster operations needed by one reconciliation pass.
///
/// Every call is a synchronous round trip from the caller's point of view.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    // Application store
    async fn get_application(&self, namespace: &str, name: &str) -> Result<Application, ClusterError>;
    async fn update_application_status(&self, namespace: &str, name: &str, status: &ApplicationStatus) -> Result<(), ClusterError>;

    // Managed object store
    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, ClusterError>;
    async fn get(&self, kind: ManagedKind, namespace: &str, name: &str) -> Result<ManagedObject, ClusterError>;
    async fn update(&self, object: &ManagedObject) -> Result<ManagedObject, ClusterError>;
}
