//! ServiceAccount generator

use super::labels::labels;
use crds::Specification;
use k8s_openapi::api::core::v1::{LocalObjectReference, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Desired ServiceAccount. Pull secrets are always a list, empty when none are configured.
pub fn generate(spec: &Specification) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(spec.service_account.clone()),
            labels: Some(labels(spec)),
            ..Default::default()
        },
        image_pull_secrets: Some(
            spec.image_pull_secrets
                .iter()
                .map(|name| LocalObjectReference { name: name.clone() })
                .collect(),
        ),
        ..Default::default()
    }
}
