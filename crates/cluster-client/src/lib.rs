//! Cluster object store client
//!
//! The Application controller talks to the cluster through a narrow
//! capability: fetch and status-update the `Application` resource, and
//! create/get/update the fixed set of managed object kinds.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, KubeClusterClient, ManagedKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//!
//! let app = client.get_application("default", "shop").await?;
//! let deployment = client.get(ManagedKind::Deployment, "default", "acme-application").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Closed kind set**: [`ManagedObject`] is a tagged union over the
//!   Deployment, Service, ServiceAccount and Ingress kinds
//! - **Error taxonomy**: API failures are classified into not-found,
//!   already-exists, conflict and throttling so callers can branch on them
//! - **Mocking**: the `test-util` feature exposes an in-memory
//!   [`MockClusterClient`]

pub mod client;
pub mod error;
pub mod object;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
pub use object::{ManagedKind, ManagedObject, ObjectKey};
#[cfg(feature = "test-util")]
pub use mock::{Call, InjectedFailure, MockClusterClient, Operation};
