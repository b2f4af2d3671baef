//! Corrective updates.
//!
//! A corrective write starts from the observed object, not the desired one.
//! Only the fields the drift detectors compare are overwritten, together
//! with labels and owner references. Everything else the platform set on the
//! object (clusterIP, defaulted pod fields, resourceVersion) is carried over,
//! so a concurrent writer surfaces as a conflict instead of being clobbered.

use cluster_client::ManagedObject;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PodSpec, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

fn apply_metadata(desired: &ObjectMeta, observed: &mut ObjectMeta) {
    observed.labels = desired.labels.clone();
    if desired.owner_references.is_some() {
        observed.owner_references = desired.owner_references.clone();
    }
}

pub fn apply_deployment(desired: &Deployment, observed: &mut Deployment) {
    apply_metadata(&desired.metadata, &mut observed.metadata);
    let Some(desired_spec) = desired.spec.as_ref() else {
        return;
    };
    let Some(observed_spec) = observed.spec.as_mut() else {
        observed.spec = Some(desired_spec.clone());
        return;
    };

    observed_spec.replicas = desired_spec.replicas;
    observed_spec.selector = desired_spec.selector.clone();

    let desired_labels = desired_spec.template.metadata.as_ref().and_then(|m| m.labels.clone());
    observed_spec
        .template
        .metadata
        .get_or_insert_with(ObjectMeta::default)
        .labels = desired_labels;

    let desired_containers = desired_spec
        .template
        .spec
        .as_ref()
        .map(|p| p.containers.clone())
        .unwrap_or_default();
    observed_spec
        .template
        .spec
        .get_or_insert_with(PodSpec::default)
        .containers = desired_containers;
}

pub fn apply_service(desired: &Service, observed: &mut Service) {
    apply_metadata(&desired.metadata, &mut observed.metadata);
    let Some(desired_spec) = desired.spec.as_ref() else {
        return;
    };
    let observed_spec = observed.spec.get_or_insert_with(Default::default);
    observed_spec.selector = desired_spec.selector.clone();
    observed_spec.ports = desired_spec.ports.clone();
}

pub fn apply_service_account(desired: &ServiceAccount, observed: &mut ServiceAccount) {
    apply_metadata(&desired.metadata, &mut observed.metadata);
    observed.image_pull_secrets = desired.image_pull_secrets.clone();
}

pub fn apply_ingress(desired: &Ingress, observed: &mut Ingress) {
    apply_metadata(&desired.metadata, &mut observed.metadata);
    let Some(desired_spec) = desired.spec.as_ref() else {
        return;
    };
    let observed_spec = observed.spec.get_or_insert_with(Default::default);
    observed_spec.rules = desired_spec.rules.clone();
}

/// Builds the corrective write for `observed` from `desired`.
///
/// Objects of different kinds leave `observed` untouched.
pub fn apply(desired: &ManagedObject, observed: &mut ManagedObject) {
    match (desired, observed) {
        (ManagedObject::Deployment(d), ManagedObject::Deployment(o)) => apply_deployment(d, o),
        (ManagedObject::Service(d), ManagedObject::Service(o)) => apply_service(d, o),
        (ManagedObject::ServiceAccount(d), ManagedObject::ServiceAccount(o)) => apply_service_account(d, o),
        (ManagedObject::Ingress(d), ManagedObject::Ingress(o)) => apply_ingress(d, o),
        _ => {}
    }
}
