//! Managed object kinds.
//!
//! The controller manages a small, closed set of Kubernetes kinds. They are
//! modelled as a tagged union rather than a trait object so every `match`
//! over them is exhaustive.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::fmt;

/// Kinds of objects owned by an `Application`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManagedKind {
    /// apps/v1 Deployment (the workload)
    Deployment,
    /// v1 Service
    Service,
    /// v1 ServiceAccount
    ServiceAccount,
    /// networking.k8s.io/v1 Ingress
    Ingress,
}

impl ManagedKind {
    /// Kubernetes kind name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::ServiceAccount => "ServiceAccount",
            Self::Ingress => "Ingress",
        }
    }

    /// Kubernetes apiVersion
    pub fn api_version(self) -> &'static str {
        match self {
            Self::Deployment => "apps/v1",
            Self::Service | Self::ServiceAccount => "v1",
            Self::Ingress => "networking.k8s.io/v1",
        }
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a managed object: kind, namespace and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Object kind
    pub kind: ManagedKind,
    /// Namespace (empty when not yet stamped)
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Builds a key from its parts
    pub fn new(kind: ManagedKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A managed object of one of the supported kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedObject {
    /// Workload
    Deployment(Deployment),
    /// Network service
    Service(Service),
    /// Service account
    ServiceAccount(ServiceAccount),
    /// Ingress route
    Ingress(Ingress),
}

impl ManagedObject {
    /// Kind of the wrapped object
    pub fn kind(&self) -> ManagedKind {
        match self {
            Self::Deployment(_) => ManagedKind::Deployment,
            Self::Service(_) => ManagedKind::Service,
            Self::ServiceAccount(_) => ManagedKind::ServiceAccount,
            Self::Ingress(_) => ManagedKind::Ingress,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(o) => &o.metadata,
            Self::Service(o) => &o.metadata,
            Self::ServiceAccount(o) => &o.metadata,
            Self::Ingress(o) => &o.metadata,
        }
    }

    /// Mutable object metadata
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Deployment(o) => &mut o.metadata,
            Self::Service(o) => &mut o.metadata,
            Self::ServiceAccount(o) => &mut o.metadata,
            Self::Ingress(o) => &mut o.metadata,
        }
    }

    /// Object name, empty if unset
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Object namespace, if stamped
    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// Stamps the namespace inherited from the owning `Application`
    pub fn set_namespace(&mut self, namespace: &str) {
        self.metadata_mut().namespace = Some(namespace.to_string());
    }

    /// Replaces the owner references with a single controller reference
    pub fn set_owner_reference(&mut self, owner: OwnerReference) {
        self.metadata_mut().owner_references = Some(vec![owner]);
    }

    /// Server-side resource version, if any
    pub fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }

    /// Sets the resource version carried on the next write
    pub fn set_resource_version(&mut self, resource_version: Option<String>) {
        self.metadata_mut().resource_version = resource_version;
    }

    /// Identity of this object
    pub fn identity_key(&self) -> ObjectKey {
        ObjectKey::new(
            self.kind(),
            self.namespace().unwrap_or_default(),
            self.name(),
        )
    }

    /// Wrapped Deployment, if this is one
    pub fn as_deployment(&self) -> Option<&Deployment> {
        match self {
            Self::Deployment(o) => Some(o),
            _ => None,
        }
    }

    /// Wrapped Service, if this is one
    pub fn as_service(&self) -> Option<&Service> {
        match self {
            Self::Service(o) => Some(o),
            _ => None,
        }
    }

    /// Wrapped ServiceAccount, if this is one
    pub fn as_service_account(&self) -> Option<&ServiceAccount> {
        match self {
            Self::ServiceAccount(o) => Some(o),
            _ => None,
        }
    }

    /// Wrapped Ingress, if this is one
    pub fn as_ingress(&self) -> Option<&Ingress> {
        match self {
            Self::Ingress(o) => Some(o),
            _ => None,
        }
    }
}

impl From<Deployment> for ManagedObject {
    fn from(o: Deployment) -> Self {
        Self::Deployment(o)
    }
}

impl From<Service> for ManagedObject {
    fn from(o: Service) -> Self {
        Self::Service(o)
    }
}

impl From<ServiceAccount> for ManagedObject {
    fn from(o: ServiceAccount) -> Self {
        Self::ServiceAccount(o)
    }
}

impl From<Ingress> for ManagedObject {
    fn from(o: Ingress) -> Self {
        Self::Ingress(o)
    }
}
