//! Resolved, per-pass view of an `Application`.
//!
//! Generators never read the raw resource. They take a `Specification`,
//! which is built once per reconciliation pass with every default applied
//! and the instance token already derived.

use crate::accessors;
use crate::application::Application;
use crate::error::CrdError;

/// Fully defaulted specification of one persisted `Application`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    /// Name shared by the generated resources
    pub name: String,
    /// Container image
    pub image: String,
    /// Deployment replica count
    pub replicas: i32,
    /// Container and service port
    pub port: i32,
    /// Service account name
    pub service_account: String,
    /// Pull secrets bound to the service account
    pub image_pull_secrets: Vec<String>,
    /// Version label
    pub version: String,
    /// Truncated resource UID
    pub instance_token: String,
}

impl Specification {
    /// Resolves every accessor for a persisted `Application`.
    ///
    /// Fails only when the resource has no UID yet.
    pub fn resolve(app: &Application) -> Result<Self, CrdError> {
        let instance_token = accessors::instance_token(app)?;
        let app = Some(app);
        Ok(Self {
            name: accessors::name(app),
            image: accessors::image(app),
            replicas: accessors::replicas(app),
            port: accessors::port(app),
            service_account: accessors::service_account(app),
            image_pull_secrets: accessors::image_pull_secrets(app),
            version: accessors::version(app),
            instance_token,
        })
    }

    /// `<name>-<instance token>`, the value of the instance label
    pub fn instance(&self) -> String {
        format!("{}-{}", self.name, self.instance_token)
    }
}
