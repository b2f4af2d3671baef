//! Mock ClusterClient for unit testing
//!
//! In-memory stand-in for the API server. It stamps server-owned metadata
//! on create (uid, resourceVersion, generation and a Service clusterIP),
//! enforces optimistic concurrency on update, records every call and can
//! be told to fail specific operations.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::object::{ManagedKind, ManagedObject, ObjectKey};
use crds::{Application, ApplicationStatus};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations that can be targeted by failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `get_application`
    GetApplication,
    /// `update_application_status`
    UpdateStatus,
    /// `create`
    Create,
    /// `get`
    Get,
    /// `update`
    Update,
}

/// Failure returned by an injected operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// 404
    NotFound,
    /// 409 AlreadyExists
    AlreadyExists,
    /// 409 Conflict
    Conflict,
    /// 429
    TooManyRequests,
    /// Arbitrary API error with the given status code
    Api(u16),
}

impl InjectedFailure {
    fn into_error(self, target: &str) -> ClusterError {
        let message = format!("injected failure for {target}");
        match self {
            Self::NotFound => ClusterError::NotFound(message),
            Self::AlreadyExists => ClusterError::AlreadyExists(message),
            Self::Conflict => ClusterError::Conflict(message),
            Self::TooManyRequests => ClusterError::TooManyRequests(message),
            Self::Api(code) => ClusterError::Api { code, message },
        }
    }
}

/// A recorded client call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Application read
    GetApplication {
        /// Application namespace
        namespace: String,
        /// Application name
        name: String,
    },
    /// Status subresource write
    UpdateStatus {
        /// Application namespace
        namespace: String,
        /// Application name
        name: String,
        /// Status that was sent
        status: ApplicationStatus,
    },
    /// Managed object create
    Create(ObjectKey),
    /// Managed object read
    Get(ObjectKey),
    /// Managed object replace
    Update(ObjectKey),
}

#[derive(Debug, Clone)]
struct FailureRule {
    operation: Operation,
    kind: Option<ManagedKind>,
    failure: InjectedFailure,
    remaining: Option<usize>,
}

impl FailureRule {
    fn matches(&self, operation: Operation, kind: Option<ManagedKind>) -> bool {
        self.operation == operation && (self.kind.is_none() || self.kind == kind)
    }
}

/// Callback run when a matching call reaches the mock
type CallHook = Arc<dyn Fn() + Send + Sync>;

struct HookRule {
    operation: Operation,
    kind: Option<ManagedKind>,
    hook: CallHook,
}

#[derive(Default)]
struct Store {
    applications: BTreeMap<(String, String), Application>,
    objects: BTreeMap<ObjectKey, ManagedObject>,
    calls: Vec<Call>,
    failures: VecDeque<FailureRule>,
    hooks: Vec<HookRule>,
    next_version: u64,
    next_cluster_ip: u8,
}

impl Store {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn take_failure(&mut self, operation: Operation, kind: Option<ManagedKind>) -> Option<InjectedFailure> {
        let index = self.failures.iter().position(|rule| rule.matches(operation, kind))?;
        let rule = self.failures.get_mut(index)?;
        let failure = rule.failure.clone();
        let exhausted = match rule.remaining.as_mut() {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        };
        if exhausted {
            self.failures.remove(index);
        }
        Some(failure)
    }
}

/// Mock ClusterClient for testing
#[derive(Clone, Default)]
pub struct MockClusterClient {
    store: Arc<Mutex<Store>>,
}

impl MockClusterClient {
    /// Create an empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an Application to the mock store as-is (for test setup)
    pub fn add_application(&self, app: Application) {
        let mut store = self.lock();
        let key = (
            app.metadata.namespace.clone().unwrap_or_default(),
            app.metadata.name.clone().unwrap_or_default(),
        );
        store.applications.insert(key, app);
    }

    /// Remove an Application from the mock store
    pub fn remove_application(&self, namespace: &str, name: &str) {
        self.lock()
            .applications
            .remove(&(namespace.to_string(), name.to_string()));
    }

    /// Current copy of a stored Application
    pub fn application(&self, namespace: &str, name: &str) -> Option<Application> {
        self.lock()
            .applications
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Insert a managed object directly, bypassing create semantics
    pub fn insert_object(&self, object: ManagedObject) {
        let mut store = self.lock();
        store.objects.insert(object.identity_key(), object);
    }

    /// Current copy of a stored managed object
    pub fn object(&self, kind: ManagedKind, namespace: &str, name: &str) -> Option<ManagedObject> {
        self.lock()
            .objects
            .get(&ObjectKey::new(kind, namespace, name))
            .cloned()
    }

    /// Number of stored managed objects
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Mutate a stored object as another writer would, bumping its resource version.
    /// Returns false if the object does not exist.
    pub fn modify_object(&self, key: &ObjectKey, mutate: impl FnOnce(&mut ManagedObject)) -> bool {
        let mut store = self.lock();
        let version = store.bump_version();
        let Some(object) = store.objects.get_mut(key) else {
            return false;
        };
        mutate(object);
        object.set_resource_version(Some(version));
        true
    }

    /// Fail the next matching call once. `kind` of `None` matches any kind.
    pub fn fail_next(&self, operation: Operation, kind: Option<ManagedKind>, failure: InjectedFailure) {
        self.lock().failures.push_back(FailureRule {
            operation,
            kind,
            failure,
            remaining: Some(1),
        });
    }

    /// Fail every matching call until [`MockClusterClient::clear_failures`]
    pub fn fail_always(&self, operation: Operation, kind: Option<ManagedKind>, failure: InjectedFailure) {
        self.lock().failures.push_back(FailureRule {
            operation,
            kind,
            failure,
            remaining: None,
        });
    }

    /// Drop all pending failure rules
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Run `hook` whenever a matching call arrives, before it is served.
    ///
    /// Lets a test act at an exact point in a caller's sequence, such as
    /// cancelling the caller while one of its requests is in flight.
    pub fn on_call(&self, operation: Operation, kind: Option<ManagedKind>, hook: impl Fn() + Send + Sync + 'static) {
        self.lock().hooks.push(HookRule {
            operation,
            kind,
            hook: Arc::new(hook),
        });
    }

    fn run_hooks(&self, operation: Operation, kind: Option<ManagedKind>) {
        let hooks: Vec<CallHook> = self
            .lock()
            .hooks
            .iter()
            .filter(|rule| rule.operation == operation && (rule.kind.is_none() || rule.kind == kind))
            .map(|rule| Arc::clone(&rule.hook))
            .collect();
        for hook in hooks {
            hook();
        }
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Keys passed to `create`, in order
    pub fn creates(&self) -> Vec<ObjectKey> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Keys passed to `update`, in order
    pub fn updates(&self) -> Vec<ObjectKey> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Statuses passed to `update_application_status`, in order
    pub fn status_writes(&self) -> Vec<ApplicationStatus> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::UpdateStatus { status, .. } => Some(status),
                _ => None,
            })
            .collect()
    }
}

fn stamp_server_fields(object: &mut ManagedObject, store: &mut Store) {
    let version = store.bump_version();
    let metadata = object.metadata_mut();
    metadata.uid = Some(uuid::Uuid::new_v4().to_string());
    metadata.resource_version = Some(version);
    metadata.generation = Some(1);

    if let ManagedObject::Service(service) = object {
        store.next_cluster_ip = store.next_cluster_ip.wrapping_add(1);
        let spec = service.spec.get_or_insert_with(Default::default);
        if spec.cluster_ip.is_none() {
            spec.cluster_ip = Some(format!("10.96.0.{}", store.next_cluster_ip));
        }
    }
}

fn require_namespace(object: &ManagedObject) -> Result<(), ClusterError> {
    match object.namespace() {
        Some(ns) if !ns.is_empty() => Ok(()),
        _ => Err(ClusterError::InvalidObject(format!("{} has no namespace", object.kind()))),
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_application(&self, namespace: &str, name: &str) -> Result<Application, ClusterError> {
        self.run_hooks(Operation::GetApplication, None);
        let mut store = self.lock();
        store.calls.push(Call::GetApplication {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        if let Some(failure) = store.take_failure(Operation::GetApplication, None) {
            return Err(failure.into_error(&format!("Application {namespace}/{name}")));
        }
        store
            .applications
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Application {namespace}/{name}")))
    }

    async fn update_application_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ApplicationStatus,
    ) -> Result<(), ClusterError> {
        self.run_hooks(Operation::UpdateStatus, None);
        let mut store = self.lock();
        store.calls.push(Call::UpdateStatus {
            namespace: namespace.to_string(),
            name: name.to_string(),
            status: status.clone(),
        });
        if let Some(failure) = store.take_failure(Operation::UpdateStatus, None) {
            return Err(failure.into_error(&format!("Application {namespace}/{name}")));
        }
        let version = store.bump_version();
        let app = store
            .applications
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClusterError::NotFound(format!("Application {namespace}/{name}")))?;
        app.status = Some(status.clone());
        app.metadata.resource_version = Some(version);
        Ok(())
    }

    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, ClusterError> {
        require_namespace(object)?;
        let key = object.identity_key();
        self.run_hooks(Operation::Create, Some(key.kind));
        let mut store = self.lock();
        store.calls.push(Call::Create(key.clone()));
        if let Some(failure) = store.take_failure(Operation::Create, Some(key.kind)) {
            return Err(failure.into_error(&key.to_string()));
        }
        if store.objects.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(key.to_string()));
        }
        let mut created = object.clone();
        stamp_server_fields(&mut created, &mut store);
        store.objects.insert(key, created.clone());
        Ok(created)
    }

    async fn get(&self, kind: ManagedKind, namespace: &str, name: &str) -> Result<ManagedObject, ClusterError> {
        let key = ObjectKey::new(kind, namespace, name);
        self.run_hooks(Operation::Get, Some(kind));
        let mut store = self.lock();
        store.calls.push(Call::Get(key.clone()));
        if let Some(failure) = store.take_failure(Operation::Get, Some(kind)) {
            return Err(failure.into_error(&key.to_string()));
        }
        store
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(key.to_string()))
    }

    async fn update(&self, object: &ManagedObject) -> Result<ManagedObject, ClusterError> {
        require_namespace(object)?;
        let key = object.identity_key();
        self.run_hooks(Operation::Update, Some(key.kind));
        let mut store = self.lock();
        store.calls.push(Call::Update(key.clone()));
        if let Some(failure) = store.take_failure(Operation::Update, Some(key.kind)) {
            return Err(failure.into_error(&key.to_string()));
        }
        let current = store
            .objects
            .get(&key)
            .ok_or_else(|| ClusterError::NotFound(key.to_string()))?;
        if let Some(expected) = object.resource_version()
            && current.resource_version() != Some(expected)
        {
            return Err(ClusterError::Conflict(format!(
                "{key}: resourceVersion {expected} is stale"
            )));
        }
        let uid = current.metadata().uid.clone();
        let generation = current.metadata().generation.unwrap_or(1) + 1;

        let mut updated = object.clone();
        let version = store.bump_version();
        let metadata = updated.metadata_mut();
        metadata.uid = uid;
        metadata.generation = Some(generation);
        metadata.resource_version = Some(version);
        store.objects.insert(key, updated.clone());
        Ok(updated)
    }
}
