//! Drift detectors.
//!
//! Each detector compares a desired object with the observed one on a fixed
//! subset of fields. Observed objects carry server-managed data (uid,
//! resourceVersion, status, defaulted fields) that must never count as drift,
//! so nothing outside these subsets is looked at.

use cluster_client::ManagedObject;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Service, ServiceAccount, ServiceSpec};
use k8s_openapi::api::networking::v1::Ingress;

/// Deployment: replicas, selector, template labels and containers.
pub fn deployment_drift(desired: &Deployment, observed: &Deployment) -> bool {
    let desired = desired.spec.as_ref();
    let observed = observed.spec.as_ref();

    desired.and_then(|s| s.replicas) != observed.and_then(|s| s.replicas)
        || desired.map(|s| &s.selector) != observed.map(|s| &s.selector)
        || template_labels(desired) != template_labels(observed)
        || containers(desired) != containers(observed)
}

fn template_labels(spec: Option<&DeploymentSpec>) -> Option<&std::collections::BTreeMap<String, String>> {
    spec.and_then(|s| s.template.metadata.as_ref())
        .and_then(|m| m.labels.as_ref())
}

fn containers(spec: Option<&DeploymentSpec>) -> Option<&Vec<k8s_openapi::api::core::v1::Container>> {
    spec.and_then(|s| s.template.spec.as_ref()).map(|p| &p.containers)
}

/// Service: selector and ports.
pub fn service_drift(desired: &Service, observed: &Service) -> bool {
    service_selector(desired.spec.as_ref()) != service_selector(observed.spec.as_ref())
        || service_ports(desired.spec.as_ref()) != service_ports(observed.spec.as_ref())
}

fn service_selector(spec: Option<&ServiceSpec>) -> Option<&std::collections::BTreeMap<String, String>> {
    spec.and_then(|s| s.selector.as_ref())
}

fn service_ports(spec: Option<&ServiceSpec>) -> Option<&Vec<k8s_openapi::api::core::v1::ServicePort>> {
    spec.and_then(|s| s.ports.as_ref())
}

/// ServiceAccount: image pull secrets. An empty list and an absent list differ.
pub fn service_account_drift(desired: &ServiceAccount, observed: &ServiceAccount) -> bool {
    desired.image_pull_secrets != observed.image_pull_secrets
}

/// Ingress: rules.
pub fn ingress_drift(desired: &Ingress, observed: &Ingress) -> bool {
    desired.spec.as_ref().and_then(|s| s.rules.as_ref())
        != observed.spec.as_ref().and_then(|s| s.rules.as_ref())
}

/// Dispatches to the detector for the pair's kind.
///
/// Objects of different kinds always count as drifted.
pub fn detect(desired: &ManagedObject, observed: &ManagedObject) -> bool {
    match (desired, observed) {
        (ManagedObject::Deployment(d), ManagedObject::Deployment(o)) => deployment_drift(d, o),
        (ManagedObject::Service(d), ManagedObject::Service(o)) => service_drift(d, o),
        (ManagedObject::ServiceAccount(d), ManagedObject::ServiceAccount(o)) => service_account_drift(d, o),
        (ManagedObject::Ingress(d), ManagedObject::Ingress(o)) => ingress_drift(d, o),
        _ => true,
    }
}
