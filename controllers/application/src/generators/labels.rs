//! Canonical identity labels and the workload selector.
//!
//! Every generator labels its object with [`labels`]. The Deployment and
//! Service select pods by [`selector`], and pod templates carry
//! [`template_labels`] so the selector is always a subset of them.

use crds::Specification;
use std::collections::BTreeMap;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_VERSION: &str = "app.kubernetes.io/version";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const SELECTOR_KEY: &str = "app";

pub const MANAGED_BY: &str = "acme-controller";
pub const PART_OF: &str = "acme-application";

/// The five canonical labels for a specification.
pub fn labels(spec: &Specification) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), spec.name.clone()),
        (LABEL_INSTANCE.to_string(), spec.instance()),
        (LABEL_VERSION.to_string(), spec.version.clone()),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string()),
        (LABEL_PART_OF.to_string(), PART_OF.to_string()),
    ])
}

/// `{app: <name>}`
pub fn selector(spec: &Specification) -> BTreeMap<String, String> {
    BTreeMap::from([(SELECTOR_KEY.to_string(), spec.name.clone())])
}

/// Canonical labels merged with the selector.
pub fn template_labels(spec: &Specification) -> BTreeMap<String, String> {
    let mut merged = labels(spec);
    merged.extend(selector(spec));
    merged
}
