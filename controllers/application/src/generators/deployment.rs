//! Deployment generator

use super::labels::{labels, template_labels};
use crds::Specification;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, ExecAction, Lifecycle, LifecycleHandler, PodSpec, PodTemplateSpec,
    ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub const CONTAINER_NAME: &str = "application-container";
pub const MAX_SURGE: &str = "25%";
pub const MAX_UNAVAILABLE: &str = "25%";
pub const TERMINATION_GRACE_PERIOD_SECONDS: i64 = 90;
pub const PRE_STOP_SLEEP_SECONDS: u32 = 30;

/// Desired Deployment for a specification.
///
/// Strategy, grace period and pre-stop hook are fixed. Running clusters
/// were created with these values, so changing them shows up as drift.
pub fn generate(spec: &Specification) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            labels: Some(labels(spec)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(template_labels(spec)),
                ..Default::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_surge: Some(IntOrString::String(MAX_SURGE.to_string())),
                    max_unavailable: Some(IntOrString::String(MAX_UNAVAILABLE.to_string())),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(template_labels(spec)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container(spec)],
                    service_account_name: Some(spec.service_account.clone()),
                    termination_grace_period_seconds: Some(TERMINATION_GRACE_PERIOD_SECONDS),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn container(spec: &Specification) -> Container {
    Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(spec.image.clone()),
        image_pull_policy: Some("Always".to_string()),
        lifecycle: Some(Lifecycle {
            pre_stop: Some(LifecycleHandler {
                exec: Some(ExecAction {
                    command: Some(vec![
                        "sh".to_string(),
                        "-c".to_string(),
                        format!("sleep {PRE_STOP_SLEEP_SECONDS}"),
                    ]),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ports: Some(vec![ContainerPort {
            container_port: spec.port,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        // The API server stores an empty requirements object
        resources: Some(ResourceRequirements::default()),
        termination_message_path: Some("/dev/termination-log".to_string()),
        termination_message_policy: Some("File".to_string()),
        ..Default::default()
    }
}
