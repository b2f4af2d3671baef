//! Defaulting accessors for the `Application` resource.
//!
//! Every accessor takes an optional reference and resolves to a concrete
//! value: an absent resource, an absent block or an absent field all fall
//! back to the documented default. The one exception is [`instance_token`],
//! which needs the cluster-assigned UID and therefore only works on a
//! persisted resource.

use crate::application::{
    Application, ApplicationSettings, BoilerPlate, DEFAULT_NAME, DEFAULT_PORT, DEFAULT_REPLICAS,
    DEFAULT_SERVICE_ACCOUNT, DEFAULT_VERSION, INSTANCE_TOKEN_LEN,
};
use crate::error::CrdError;
use kube::ResourceExt;

fn settings(app: Option<&Application>) -> Option<&ApplicationSettings> {
    app.and_then(|a| a.spec.application.as_ref())
}

fn boiler_plate(app: Option<&Application>) -> Option<&BoilerPlate> {
    app.and_then(|a| a.spec.boiler_plate.as_ref())
}

/// Replica count for the Deployment (default 1)
pub fn replicas(app: Option<&Application>) -> i32 {
    settings(app)
        .and_then(|s| s.replicas)
        .unwrap_or(DEFAULT_REPLICAS)
}

/// Container image; empty when no application block exists
pub fn image(app: Option<&Application>) -> String {
    settings(app).map(|s| s.image.clone()).unwrap_or_default()
}

/// Container port (default 8081)
pub fn port(app: Option<&Application>) -> i32 {
    settings(app).and_then(|s| s.port).unwrap_or(DEFAULT_PORT)
}

/// Service account name (default `acme-application-sa`)
pub fn service_account(app: Option<&Application>) -> String {
    boiler_plate(app)
        .and_then(|b| b.service_account.clone())
        .unwrap_or_else(|| DEFAULT_SERVICE_ACCOUNT.to_string())
}

/// Pull secret names, never absent: an empty list when nothing is configured
pub fn image_pull_secrets(app: Option<&Application>) -> Vec<String> {
    boiler_plate(app)
        .and_then(|b| b.image_pull_secrets.clone())
        .unwrap_or_default()
}

/// Name shared by the generated resources (default `acme-application`)
pub fn name(app: Option<&Application>) -> String {
    boiler_plate(app)
        .and_then(|b| b.name_prefix.clone())
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}

/// Version label (default `v1.0.0`)
pub fn version(app: Option<&Application>) -> String {
    boiler_plate(app)
        .and_then(|b| b.version.clone())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// First six characters of the cluster-assigned UID.
///
/// Fails with [`CrdError::MissingUid`] when the resource was never persisted.
pub fn instance_token(app: &Application) -> Result<String, CrdError> {
    let uid = app
        .metadata
        .uid
        .as_deref()
        .ok_or_else(|| CrdError::MissingUid(app.name_any()))?;
    Ok(uid.chars().take(INSTANCE_TOKEN_LEN).collect())
}
