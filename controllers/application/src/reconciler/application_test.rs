//! Reconciliation pass scenarios against the in-memory cluster

use super::status::{REASON_COMPLETED, REASON_PROGRESSING};
use super::*;
use crate::generators;
use crate::test_utils::{create_test_application, create_test_reconciler};
use cluster_client::{Call, InjectedFailure, ManagedObject, MockClusterClient, ObjectKey, Operation};
use crds::ApplicationStatus;

const NS: &str = "shop";
const APP: &str = "web";
const NAME: &str = "acme-application";

fn inspect_all() -> ReconcilerConfig {
    ReconcilerConfig {
        drift_scan: DriftScanPolicy::InspectAllKinds,
        ..Default::default()
    }
}

fn test_spec() -> Specification {
    Specification::resolve(&create_test_application(NS, APP)).unwrap()
}

/// Creates the object on the mock as a previous pass would have
async fn seed(mock: &MockClusterClient, mut object: ManagedObject) -> ManagedObject {
    object.set_namespace(NS);
    mock.create(&object).await.unwrap()
}

fn key(kind: ManagedKind, name: &str) -> ObjectKey {
    ObjectKey::new(kind, NS, name)
}

fn deployment_replicas(mock: &MockClusterClient) -> Option<i32> {
    mock.object(ManagedKind::Deployment, NS, NAME)
        .and_then(|o| o.as_deployment().and_then(|d| d.spec.as_ref()).and_then(|s| s.replicas))
}

fn stored_status(mock: &MockClusterClient) -> Option<ApplicationStatus> {
    mock.application(NS, APP).and_then(|a| a.status)
}

#[tokio::test]
async fn test_fresh_application_creates_all_kinds() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());

    let outcome = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, PassOutcome::Settled);

    assert_eq!(
        mock.creates(),
        vec![
            key(ManagedKind::Deployment, NAME),
            key(ManagedKind::Service, NAME),
            key(ManagedKind::ServiceAccount, "acme-application-sa"),
        ]
    );
    assert!(mock.updates().is_empty());
    assert_eq!(deployment_replicas(&mock), Some(3));

    let deployment = mock.object(ManagedKind::Deployment, NS, NAME).unwrap();
    let container_port = deployment
        .as_deployment()
        .and_then(|d| d.spec.as_ref())
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|p| p.containers[0].ports.as_ref())
        .map(|ports| ports[0].container_port);
    assert_eq!(container_port, Some(9090));

    let service = mock.object(ManagedKind::Service, NS, NAME).unwrap();
    let service_port = service
        .as_service()
        .and_then(|s| s.spec.as_ref())
        .and_then(|s| s.ports.as_ref())
        .map(|ports| ports[0].port);
    assert_eq!(service_port, Some(9090));

    let sa = mock
        .object(ManagedKind::ServiceAccount, NS, "acme-application-sa")
        .unwrap();
    assert_eq!(sa.as_service_account().unwrap().image_pull_secrets, Some(vec![]));

    let writes = mock.status_writes();
    assert_eq!(writes.len(), 2);
    assert!(writes[0].progressing);
    assert_eq!(writes[0].reason, REASON_PROGRESSING);
    assert_eq!(
        stored_status(&mock),
        Some(ApplicationStatus {
            progressing: false,
            reason: REASON_COMPLETED.to_string(),
        })
    );
}

#[tokio::test]
async fn test_created_objects_are_owned_and_namespaced() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    for created in mock.creates() {
        let object = mock.object(created.kind, NS, &created.name).unwrap();
        assert_eq!(object.namespace(), Some(NS));
        let owners = object.metadata().owner_references.clone().unwrap_or_default();
        assert_eq!(owners.len(), 1, "{created} has no owner");
        assert_eq!(owners[0].kind, "Application");
        assert_eq!(owners[0].name, APP);
        assert_eq!(owners[0].uid, crate::test_utils::TEST_UID);
        assert_eq!(owners[0].controller, Some(true));
    }
}

#[tokio::test]
async fn test_replica_drift_is_corrected() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let mut stale = test_spec();
    stale.replicas = 1;
    seed(&mock, generators::deployment(&stale)).await;
    mock.clear_calls();

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let outcome = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PassOutcome::Settled);
    assert_eq!(mock.updates(), vec![key(ManagedKind::Deployment, NAME)]);
    assert_eq!(deployment_replicas(&mock), Some(3));
}

#[tokio::test]
async fn test_converged_service_ends_pass_early() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    seed(&mock, generators::service(&test_spec())).await;
    mock.clear_calls();

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let outcome = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PassOutcome::StoppedAtConverged(ManagedKind::Service));
    assert_eq!(
        mock.creates(),
        vec![key(ManagedKind::Deployment, NAME), key(ManagedKind::Service, NAME)]
    );
    assert!(mock.updates().is_empty());
    assert!(mock.object(ManagedKind::ServiceAccount, NS, "acme-application-sa").is_none());
    // The early exit leaves the progressing status in place
    assert_eq!(stored_status(&mock).map(|s| s.progressing), Some(true));
}

#[tokio::test]
async fn test_inspect_all_kinds_continues_past_converged_kind() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let spec = test_spec();
    seed(&mock, generators::deployment(&spec)).await;
    let mut stale = spec.clone();
    stale.port = 8081;
    seed(&mock, generators::service(&stale)).await;
    mock.clear_calls();

    let reconciler = create_test_reconciler(&mock, inspect_all());
    let outcome = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PassOutcome::Settled);
    assert_eq!(mock.updates(), vec![key(ManagedKind::Service, NAME)]);
    assert_eq!(mock.creates().last(), Some(&key(ManagedKind::ServiceAccount, "acme-application-sa")));
    assert_eq!(stored_status(&mock).map(|s| s.reason), Some(REASON_COMPLETED.to_string()));
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    for config in [ReconcilerConfig::default(), inspect_all()] {
        let mock = MockClusterClient::new();
        mock.add_application(create_test_application(NS, APP));
        let reconciler = create_test_reconciler(&mock, config);
        let cancel = CancellationToken::new();

        reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();
        mock.clear_calls();
        reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

        assert!(mock.updates().is_empty());
        assert_eq!(mock.object_count(), 3);
    }
}

#[tokio::test]
async fn test_second_pass_writes_status_only_when_it_changes() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let reconciler = create_test_reconciler(&mock, inspect_all());
    let cancel = CancellationToken::new();

    reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();
    mock.clear_calls();
    let outcome = reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

    assert_eq!(outcome, PassOutcome::Settled);
    // progressing then completed again; each differs from what is stored
    assert_eq!(mock.status_writes().len(), 2);
}

#[tokio::test]
async fn test_server_defaults_do_not_cause_drift() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let reconciler = create_test_reconciler(&mock, inspect_all());
    let cancel = CancellationToken::new();
    reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

    mock.modify_object(&key(ManagedKind::Deployment, NAME), |object| {
        if let ManagedObject::Deployment(d) = object {
            d.metadata.annotations = Some(
                [("deployment.kubernetes.io/revision".to_string(), "1".to_string())].into(),
            );
            if let Some(s) = d.spec.as_mut() {
                s.progress_deadline_seconds = Some(600);
                s.revision_history_limit = Some(10);
            }
        }
    });
    mock.clear_calls();
    reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();
    assert!(mock.updates().is_empty());
}

#[tokio::test]
async fn test_corrective_update_keeps_cluster_ip() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let mut stale = test_spec();
    stale.port = 8081;
    let seeded = seed(&mock, generators::service(&stale)).await;
    let cluster_ip = seeded.as_service().and_then(|s| s.spec.as_ref()).and_then(|s| s.cluster_ip.clone());
    assert!(cluster_ip.is_some());

    let reconciler = create_test_reconciler(&mock, inspect_all());
    reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    let service = mock.object(ManagedKind::Service, NS, NAME).unwrap();
    let spec = service.as_service().and_then(|s| s.spec.clone()).unwrap();
    assert_eq!(spec.cluster_ip, cluster_ip);
    assert_eq!(spec.ports.unwrap()[0].port, 9090);
}

#[tokio::test]
async fn test_fetch_failure_marks_status_failed() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    seed(&mock, generators::deployment(&test_spec())).await;
    mock.fail_next(Operation::Get, Some(ManagedKind::Deployment), InjectedFailure::Api(500));

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let err = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Fetch { .. }));
    assert!(err.is_retryable());
    let status = stored_status(&mock).unwrap();
    assert!(!status.progressing);
    assert!(status.reason.contains("failed to reconcile"), "{}", status.reason);
}

#[tokio::test]
async fn test_create_failure_aborts_remaining_kinds() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    mock.fail_next(Operation::Create, Some(ManagedKind::Service), InjectedFailure::Api(503));

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let err = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Create { .. }));
    assert_eq!(
        mock.creates(),
        vec![key(ManagedKind::Deployment, NAME), key(ManagedKind::Service, NAME)]
    );
    assert_eq!(mock.object_count(), 1);
    assert_eq!(stored_status(&mock).map(|s| s.progressing), Some(false));
}

#[tokio::test]
async fn test_update_conflict_is_requeued() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let mut stale = test_spec();
    stale.replicas = 1;
    seed(&mock, generators::deployment(&stale)).await;
    mock.fail_next(Operation::Update, Some(ManagedKind::Deployment), InjectedFailure::Conflict);

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let err = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Update {
            source: ClusterError::Conflict(_),
            ..
        }
    ));
    assert_eq!(deployment_replicas(&mock), Some(1));
    assert!(stored_status(&mock).unwrap().reason.starts_with("failed to reconcile cluster state"));
}

#[tokio::test]
async fn test_status_contention_does_not_fail_pass() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    mock.fail_always(Operation::UpdateStatus, None, InjectedFailure::TooManyRequests);

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let outcome = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PassOutcome::Settled);
    assert_eq!(mock.object_count(), 3);
    assert_eq!(stored_status(&mock), None);
}

#[tokio::test]
async fn test_missing_application_ends_silently() {
    let mock = MockClusterClient::new();
    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());

    let outcome = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PassOutcome::SpecificationGone);
    assert_eq!(
        mock.calls(),
        vec![Call::GetApplication {
            namespace: NS.to_string(),
            name: APP.to_string(),
        }]
    );
}

#[tokio::test]
async fn test_missing_uid_is_invariant_violation() {
    let mock = MockClusterClient::new();
    let mut app = create_test_application(NS, APP);
    app.metadata.uid = None;
    mock.add_application(app);

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let err = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::InvariantViolation(_)));
    assert!(!err.is_retryable());
    assert!(mock.status_writes().is_empty());
    assert!(mock.creates().is_empty());
}

#[tokio::test]
async fn test_cancelled_pass_writes_nothing() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let outcome = reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

    assert_eq!(outcome, PassOutcome::Cancelled);
    assert!(mock.calls().is_empty());
}

/// Cancels `cancel` as soon as the mock receives a matching call
fn cancel_on(mock: &MockClusterClient, operation: Operation, kind: Option<ManagedKind>, cancel: &CancellationToken) {
    let cancel = cancel.clone();
    mock.on_call(operation, kind, move || cancel.cancel());
}

#[tokio::test]
async fn test_cancel_after_progressing_write_stops_before_any_mutation() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let cancel = CancellationToken::new();
    cancel_on(&mock, Operation::UpdateStatus, None, &cancel);

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let outcome = reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

    assert_eq!(outcome, PassOutcome::Cancelled);
    assert_eq!(mock.status_writes().len(), 1);
    assert!(matches!(mock.calls().last(), Some(Call::UpdateStatus { .. })));
    assert!(mock.creates().is_empty());
    assert_eq!(mock.object_count(), 0);
}

#[tokio::test]
async fn test_cancel_during_drift_fetch_skips_correction_and_status() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let mut stale = test_spec();
    stale.replicas = 1;
    seed(&mock, generators::deployment(&stale)).await;
    mock.clear_calls();

    let cancel = CancellationToken::new();
    cancel_on(&mock, Operation::Get, Some(ManagedKind::Deployment), &cancel);

    let reconciler = create_test_reconciler(&mock, inspect_all());
    let outcome = reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

    assert_eq!(outcome, PassOutcome::Cancelled);
    assert_eq!(mock.calls().last(), Some(&Call::Get(key(ManagedKind::Deployment, NAME))));
    assert!(mock.updates().is_empty());
    assert_eq!(deployment_replicas(&mock), Some(1));
    assert_eq!(mock.creates(), vec![key(ManagedKind::Deployment, NAME)]);
    // Only the progressing write made before the fetch
    assert_eq!(mock.status_writes().len(), 1);
    assert_eq!(stored_status(&mock).map(|s| s.progressing), Some(true));
}

#[tokio::test]
async fn test_cancel_after_create_skips_remaining_kinds() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let cancel = CancellationToken::new();
    cancel_on(&mock, Operation::Create, Some(ManagedKind::Deployment), &cancel);

    let reconciler = create_test_reconciler(&mock, inspect_all());
    let outcome = reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

    assert_eq!(outcome, PassOutcome::Cancelled);
    assert_eq!(mock.creates(), vec![key(ManagedKind::Deployment, NAME)]);
    assert_eq!(mock.object_count(), 1);
    assert!(mock.status_writes().iter().all(|s| s.progressing));
}

#[tokio::test]
async fn test_cancelled_failure_writes_no_failure_status() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    mock.fail_next(Operation::Create, Some(ManagedKind::Service), InjectedFailure::Api(503));
    let cancel = CancellationToken::new();
    cancel_on(&mock, Operation::Create, Some(ManagedKind::Service), &cancel);

    let reconciler = create_test_reconciler(&mock, ReconcilerConfig::default());
    let outcome = reconciler.reconcile_application(NS, APP, &cancel).await.unwrap();

    assert_eq!(outcome, PassOutcome::Cancelled);
    assert_eq!(mock.calls().last(), Some(&Call::Create(key(ManagedKind::Service, NAME))));
    assert_eq!(mock.status_writes().len(), 1);
    assert_eq!(stored_status(&mock).map(|s| s.progressing), Some(true));
}

#[tokio::test]
async fn test_ingress_is_managed_when_enabled() {
    let mock = MockClusterClient::new();
    mock.add_application(create_test_application(NS, APP));
    let config = ReconcilerConfig {
        manage_ingress: true,
        ..Default::default()
    };
    let reconciler = create_test_reconciler(&mock, config);

    let outcome = reconciler
        .reconcile_application(NS, APP, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PassOutcome::Settled);
    assert_eq!(mock.creates().last(), Some(&key(ManagedKind::Ingress, NAME)));
    assert_eq!(mock.object_count(), 4);
}
