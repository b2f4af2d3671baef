//! Manifest generators.
//!
//! One pure function per managed kind maps a resolved [`Specification`] to
//! the complete desired object. Namespace and owner reference are stamped
//! later by the reconciler.

pub mod deployment;
pub mod ingress;
pub mod labels;
pub mod service;
pub mod service_account;

use cluster_client::ManagedObject;
use crds::Specification;

pub fn deployment(spec: &Specification) -> ManagedObject {
    deployment::generate(spec).into()
}

pub fn service(spec: &Specification) -> ManagedObject {
    service::generate(spec).into()
}

pub fn service_account(spec: &Specification) -> ManagedObject {
    service_account::generate(spec).into()
}

pub fn ingress(spec: &Specification) -> ManagedObject {
    ingress::generate(spec).into()
}
