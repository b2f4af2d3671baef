//! Kubernetes-backed implementation of [`ClusterClientTrait`].

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::object::{ManagedKind, ManagedObject};
use crds::{Application, ApplicationStatus};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Cluster client talking to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Wraps an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn target(object: &ManagedObject) -> Result<(String, String), ClusterError> {
    let namespace = object
        .namespace()
        .ok_or_else(|| ClusterError::InvalidObject(format!("{} has no namespace", object.kind())))?;
    if object.name().is_empty() {
        return Err(ClusterError::InvalidObject(format!("{} has no name", object.kind())));
    }
    Ok((namespace.to_string(), object.name().to_string()))
}

async fn create_typed<K>(api: Api<K>, object: &K) -> Result<K, ClusterError>
where
    K: Clone + DeserializeOwned + Serialize + Debug,
{
    Ok(api.create(&PostParams::default(), object).await?)
}

async fn replace_typed<K>(api: Api<K>, name: &str, object: &K) -> Result<K, ClusterError>
where
    K: Clone + DeserializeOwned + Serialize + Debug,
{
    Ok(api.replace(name, &PostParams::default(), object).await?)
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_application(&self, namespace: &str, name: &str) -> Result<Application, ClusterError> {
        debug!(namespace, name, "Fetching Application");
        Ok(self.api::<Application>(namespace).get(name).await?)
    }

    async fn update_application_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ApplicationStatus,
    ) -> Result<(), ClusterError> {
        let status_patch = serde_json::json!({ "status": status });
        self.api::<Application>(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }

    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, ClusterError> {
        let (namespace, _) = target(object)?;
        debug!(key = %object.identity_key(), "Creating object");
        Ok(match object {
            ManagedObject::Deployment(o) => create_typed(self.api::<Deployment>(&namespace), o).await?.into(),
            ManagedObject::Service(o) => create_typed(self.api::<Service>(&namespace), o).await?.into(),
            ManagedObject::ServiceAccount(o) => create_typed(self.api::<ServiceAccount>(&namespace), o).await?.into(),
            ManagedObject::Ingress(o) => create_typed(self.api::<Ingress>(&namespace), o).await?.into(),
        })
    }

    async fn get(&self, kind: ManagedKind, namespace: &str, name: &str) -> Result<ManagedObject, ClusterError> {
        debug!(%kind, namespace, name, "Fetching object");
        Ok(match kind {
            ManagedKind::Deployment => self.api::<Deployment>(namespace).get(name).await?.into(),
            ManagedKind::Service => self.api::<Service>(namespace).get(name).await?.into(),
            ManagedKind::ServiceAccount => self.api::<ServiceAccount>(namespace).get(name).await?.into(),
            ManagedKind::Ingress => self.api::<Ingress>(namespace).get(name).await?.into(),
        })
    }

    async fn update(&self, object: &ManagedObject) -> Result<ManagedObject, ClusterError> {
        let (namespace, name) = target(object)?;
        debug!(key = %object.identity_key(), resource_version = ?object.resource_version(), "Replacing object");
        Ok(match object {
            ManagedObject::Deployment(o) => replace_typed(self.api::<Deployment>(&namespace), &name, o).await?.into(),
            ManagedObject::Service(o) => replace_typed(self.api::<Service>(&namespace), &name, o).await?.into(),
            ManagedObject::ServiceAccount(o) => replace_typed(self.api::<ServiceAccount>(&namespace), &name, o).await?.into(),
            ManagedObject::Ingress(o) => replace_typed(self.api::<Ingress>(&namespace), &name, o).await?.into(),
        })
    }
}
