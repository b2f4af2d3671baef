//! Test utilities for unit testing the generators and the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::metrics::Metrics;
use crate::reconciler::{Reconciler, ReconcilerConfig};
use cluster_client::{ManagedObject, MockClusterClient};
use crds::{Application, ApplicationSettings, ApplicationSpec, Specification};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use prometheus::Registry;
use std::sync::Arc;

pub const TEST_UID: &str = "0a1b2c3d-4e5f-6789-abcd-ef0123456789";

/// Resolved specification used by generator tests
pub fn create_test_specification() -> Specification {
    Specification {
        name: "shop".to_string(),
        image: "example.com/img:v1".to_string(),
        replicas: 3,
        port: 9090,
        service_account: "shop-sa".to_string(),
        image_pull_secrets: vec![],
        version: "v2.3.0".to_string(),
        instance_token: "0a1b2c".to_string(),
    }
}

/// Persisted Application with image `example.com/img:v1`, 3 replicas and port 9090
pub fn create_test_application(namespace: &str, name: &str) -> Application {
    Application {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(TEST_UID.to_string()),
            resource_version: Some("1".to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec: ApplicationSpec {
            application: Some(ApplicationSettings {
                image: "example.com/img:v1".to_string(),
                replicas: Some(3),
                port: Some(9090),
            }),
            boiler_plate: None,
        },
        status: None,
    }
}

/// Copy of `desired` as the API server would return it
pub fn observe(desired: &ManagedObject) -> ManagedObject {
    let mut observed = desired.clone();
    let metadata = observed.metadata_mut();
    metadata.namespace = Some("shop".to_string());
    metadata.uid = Some("11111111-2222-3333-4444-555555555555".to_string());
    metadata.resource_version = Some("42".to_string());
    metadata.generation = Some(3);
    if let ManagedObject::Service(service) = &mut observed
        && let Some(spec) = service.spec.as_mut()
    {
        spec.cluster_ip = Some("10.96.0.10".to_string());
        spec.session_affinity = Some("None".to_string());
    }
    observed
}

/// Reconciler over `mock` with private metrics
pub fn create_test_reconciler(mock: &MockClusterClient, config: ReconcilerConfig) -> Reconciler {
    let metrics = Metrics::new(&Registry::new()).expect("metrics registration");
    Reconciler::new(Arc::new(mock.clone()), config, Arc::new(metrics))
}
