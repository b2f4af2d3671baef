//! Application CRD
//!
//! Declares a single containerised application: the operator keeps a
//! Deployment, a Service, a ServiceAccount and optionally an Ingress in
//! line with it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the `Application` resource
pub const API_GROUP: &str = "acme.io";

/// Default application name, used when `boilerPlate.namePrefix` is absent
pub const DEFAULT_NAME: &str = "acme-application";

/// Default service account name, used when `boilerPlate.serviceAccount` is absent
pub const DEFAULT_SERVICE_ACCOUNT: &str = "acme-application-sa";

/// Default version label
pub const DEFAULT_VERSION: &str = "v1.0.0";

/// Default replica count
pub const DEFAULT_REPLICAS: i32 = 1;

/// Default container port
pub const DEFAULT_PORT: i32 = 8081;

/// Number of UID characters kept in the instance token
pub const INSTANCE_TOKEN_LEN: usize = 6;

/// Desired state of an Application: the workload and its bootstrap metadata.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "acme.io",
    version = "v1beta1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus",
    shortname = "app",
    printcolumn = r#"{"name":"Progressing","type":"boolean","jsonPath":".status.progressing"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Application specific information used to deploy and run the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationSettings>,

    /// Bootstrap metadata that is not tied to the application itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boiler_plate: Option<BoilerPlate>,
}

/// Container image, replica count and port of the workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSettings {
    /// Fully qualified pull location of the container image
    pub image: String,

    /// Number of replicas for the downstream Deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Port exposed by the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
}

/// Naming, labelling and service account overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoilerPlate {
    /// Name of the service account to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    /// Pull secrets bound to the generated service account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secrets: Option<Vec<String>>,

    /// Overrides the generated resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,

    /// Version used in the static labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Observed state of an Application.
///
/// Owned exclusively by the controller. Both fields are always serialized so
/// that a merge patch can flip `progressing` back to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    /// Whether an install or corrective pass is in flight
    #[serde(default)]
    pub progressing: bool,

    /// Why `progressing` has its current value
    #[serde(default)]
    pub reason: String,
}
