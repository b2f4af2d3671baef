//! Kubernetes resource watcher.
//!
//! Runs a `kube_runtime::Controller` over `Application` resources that also
//! owns the managed kinds, so a change to a Deployment, Service,
//! ServiceAccount or Ingress carrying an Application owner reference
//! triggers a pass for that Application.
//!
//! Every watch stream is filtered down to generation changes. Status writes
//! (the engine's own, or the cluster's on owned objects) leave the generation
//! untouched and so never schedule another pass.

use crate::error::ControllerError;
use crate::reconciler::{PassOutcome, Reconciler};
use crds::Application;
use futures::{Stream, StreamExt, future};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::reflector::{self, ObjectRef};
use kube_runtime::{Controller, WatchStreamExt, watcher};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile call
pub struct Context {
    /// Engine run for each triggered Application
    pub reconciler: Reconciler,
    /// Parent of every pass's cancellation token
    pub shutdown: CancellationToken,
}

/// Maps a finished pass to the controller action.
pub fn action_for(outcome: &PassOutcome) -> Action {
    match outcome {
        PassOutcome::SpecificationGone
        | PassOutcome::Settled
        | PassOutcome::StoppedAtConverged(_)
        | PassOutcome::Cancelled => Action::await_change(),
    }
}

/// Maps a failed pass to the controller action.
pub fn action_for_error(error: &ControllerError, requeue_after: Duration) -> Action {
    if error.is_retryable() {
        Action::requeue(requeue_after)
    } else {
        Action::await_change()
    }
}

async fn reconcile(app: Arc<Application>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let namespace = app.namespace().unwrap_or_default();
    let name = app.name_any();
    debug!("Reconciling Application {}/{}", namespace, name);

    let cancel = ctx.shutdown.child_token();
    let outcome = ctx
        .reconciler
        .reconcile_application(&namespace, &name, &cancel)
        .await?;
    debug!("Pass for {}/{} ended: {:?}", namespace, name, outcome);
    Ok(action_for(&outcome))
}

fn error_policy(app: Arc<Application>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let requeue_after = ctx.reconciler.config().requeue_after;
    let action = action_for_error(error, requeue_after);
    if error.is_retryable() {
        warn!(
            "Reconciliation error for Application {}: {}, requeueing in {:?}",
            app.name_any(),
            error,
            requeue_after
        );
    } else {
        error!("Application {} cannot be reconciled: {}", app.name_any(), error);
    }
    action
}

/// Passes on watch events whose object generation has not been seen yet.
///
/// Objects without a generation always pass, as do deletions, so a removed
/// managed object still triggers its owner.
pub struct GenerationFilter<K: Resource> {
    seen: HashMap<ObjectRef<K>, Option<i64>>,
}

impl<K> Default for GenerationFilter<K>
where
    K: Resource,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    fn default() -> Self {
        Self { seen: HashMap::new() }
    }
}

impl<K> GenerationFilter<K>
where
    K: Resource,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    /// Returns the object to trigger on, if any.
    pub fn admit(&mut self, event: watcher::Event<K>) -> Option<K> {
        match event {
            watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => {
                let generation = obj.meta().generation;
                match self.seen.insert(ObjectRef::from_obj(&obj), generation) {
                    Some(previous) if generation.is_some() && previous == generation => None,
                    _ => Some(obj),
                }
            }
            watcher::Event::Delete(obj) => {
                self.seen.remove(&ObjectRef::from_obj(&obj));
                Some(obj)
            }
            watcher::Event::Init | watcher::Event::InitDone => None,
        }
    }
}

/// Filters a raw watch stream down to generation changes and deletions.
fn generation_changes<K, S>(events: S) -> impl Stream<Item = Result<K, watcher::Error>> + Send + 'static
where
    K: Resource + Send + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone + Send,
    S: Stream<Item = Result<watcher::Event<K>, watcher::Error>> + Send + 'static,
{
    let mut filter = GenerationFilter::default();
    events.filter_map(move |event| {
        future::ready(match event {
            Ok(event) => filter.admit(event).map(Ok),
            Err(e) => Some(Err(e)),
        })
    })
}

fn owned_changes<K>(
    client: &Client,
    namespace: Option<&str>,
) -> impl Stream<Item = Result<K, watcher::Error>> + Send + use<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    generation_changes(watcher(namespaced_or_all::<K>(client, namespace), watcher::Config::default()).default_backoff())
}

fn namespaced_or_all<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watches Applications and their owned objects until shutdown.
pub async fn watch_applications(
    client: Client,
    namespace: Option<String>,
    ctx: Arc<Context>,
) -> Result<(), ControllerError> {
    let ns = namespace.as_deref();
    let manage_ingress = ctx.reconciler.config().manage_ingress;
    info!("Starting Application watcher for {:?}", ctx.reconciler.registry().kinds());

    // Debounce batches bursts of owned-object events into one pass
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    let (reader, writer) = reflector::store();
    let applications = generation_changes(
        watcher(namespaced_or_all::<Application>(&client, ns), watcher::Config::default())
            .default_backoff()
            .reflect(writer),
    );

    let mut controller = Controller::for_stream(applications, reader)
        .with_config(controller_config)
        .owns_stream(owned_changes::<Deployment>(&client, ns))
        .owns_stream(owned_changes::<Service>(&client, ns))
        .owns_stream(owned_changes::<ServiceAccount>(&client, ns));
    if manage_ingress {
        controller = controller.owns_stream(owned_changes::<Ingress>(&client, ns));
    }

    // In-flight passes observe the same token through their child tokens
    let shutdown = ctx.shutdown.clone();
    controller
        .graceful_shutdown_on(shutdown.cancelled_owned())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {}", obj),
                Err(e) => error!("Controller error for Application: {}", e),
            }
        })
        .await;

    info!("Application watcher stopped");
    Ok(())
}
