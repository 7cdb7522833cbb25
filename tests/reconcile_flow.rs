// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end reconciliation scenarios against the in-memory store.
//!
//! These tests drive the public reconciler API through the whole lifecycle of
//! a `DeviceConfig`: creation, steady state, conflicts with other
//! `DeviceConfig`s and deletion.

mod common;

use common::{device_config, labels};
use device_config_operator::constants::DEVICE_CONFIG_DELETION_FINALIZER;
use device_config_operator::crd::{default_node_selector_key, DeviceConfig};
use device_config_operator::events::{EventSeverity, RecordingEventPublisher};
use device_config_operator::metrics::Metrics;
use device_config_operator::reconcilers::status::find_condition;
use device_config_operator::reconcilers::{
    DeviceConfigReconciler, OperationResult, ReconcileOutcome,
};
use device_config_operator::status_reasons::{CONDITION_TYPE_ERRORED, CONDITION_TYPE_READY};
use device_config_operator::store::memory::StoreOp;
use device_config_operator::store::{ClusterStore, InMemoryStore};
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use std::sync::Arc;

const NAMESPACE: &str = "drivers";

fn reconciler(
    store: &InMemoryStore,
    events: &RecordingEventPublisher,
    metrics: &Metrics,
) -> DeviceConfigReconciler {
    DeviceConfigReconciler::new(
        Arc::new(store.clone()),
        Arc::new(events.clone()),
        metrics.clone(),
    )
}

fn key(name: &str) -> ObjectRef<DeviceConfig> {
    ObjectRef::new(name).within(NAMESPACE)
}

#[tokio::test]
async fn test_device_config_lifecycle() {
    let store = InMemoryStore::new();
    let events = RecordingEventPublisher::new();
    let metrics = Metrics::new().unwrap();
    let reconciler = reconciler(&store, &events, &metrics);
    store.add_node("worker-1", labels(&[(default_node_selector_key().as_str(), "true")]));
    store.add_device_config(device_config(NAMESPACE, "gpu", None));

    // Creation
    let outcome = reconciler.reconcile(&key("gpu")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Reconciled(OperationResult::Created));

    let module = store.module(NAMESPACE, "gpu-module").unwrap();
    assert_eq!(
        module.spec.module_loader.container.kernel_mappings[0]
            .container_image
            .as_deref(),
        Some("driver:test-${KERNEL_FULL_VERSION}")
    );
    assert_eq!(module.owner_references()[0].name, "gpu");
    let stored = store.device_config(NAMESPACE, "gpu").unwrap();
    assert_eq!(stored.finalizers(), [DEVICE_CONFIG_DELETION_FINALIZER]);
    let ready_at = find_condition(stored.conditions(), CONDITION_TYPE_READY)
        .unwrap()
        .last_transition_time
        .clone();

    // Steady state
    store.clear_calls();
    let outcome = reconciler.reconcile(&key("gpu")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Reconciled(OperationResult::Unchanged));
    assert_eq!(store.count(StoreOp::CreateModule), 0);
    assert_eq!(store.count(StoreOp::PatchModule), 0);
    let stored = store.device_config(NAMESPACE, "gpu").unwrap();
    assert_eq!(
        find_condition(stored.conditions(), CONDITION_TYPE_READY)
            .unwrap()
            .last_transition_time,
        ready_at
    );

    // Deletion
    store.mark_for_deletion(NAMESPACE, "gpu").unwrap();
    let outcome = reconciler.reconcile(&key("gpu")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Finalized);
    assert!(store.module(NAMESPACE, "gpu-module").is_none());
    assert!(store.device_config(NAMESPACE, "gpu").is_none());

    // Gone
    let outcome = reconciler.reconcile(&key("gpu")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::NotFound);
}

#[tokio::test]
async fn test_default_selectors_conflict_on_vendor_nodes() {
    let store = InMemoryStore::new();
    let events = RecordingEventPublisher::new();
    let metrics = Metrics::new().unwrap();
    let reconciler = reconciler(&store, &events, &metrics);
    store.add_node("worker-1", labels(&[(default_node_selector_key().as_str(), "true")]));
    store.add_device_config(device_config(NAMESPACE, "first", None));
    store.add_device_config(device_config(NAMESPACE, "second", None));

    for name in ["first", "second"] {
        let outcome = reconciler.reconcile(&key(name)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Conflict);
        assert!(store.module(NAMESPACE, &format!("{name}-module")).is_none());
        assert!((metrics.reconciliation_failed(name) - 1.0).abs() < f64::EPSILON);
    }

    let warnings = events
        .events()
        .into_iter()
        .filter(|e| e.severity == EventSeverity::Warning)
        .count();
    assert_eq!(warnings, 2);
}

#[tokio::test]
async fn test_resolving_conflict_lets_both_configs_reconcile() {
    let store = InMemoryStore::new();
    let events = RecordingEventPublisher::new();
    let metrics = Metrics::new().unwrap();
    let reconciler = reconciler(&store, &events, &metrics);
    store.add_node("worker-a", labels(&[("pool", "a")]));
    store.add_node("worker-b", labels(&[("pool", "b")]));
    store.add_device_config(device_config(NAMESPACE, "first", Some(labels(&[("pool", "a")]))));
    store.add_device_config(device_config(NAMESPACE, "second", Some(labels(&[("pool", "a")]))));

    assert_eq!(
        reconciler.reconcile(&key("first")).await.unwrap(),
        ReconcileOutcome::Conflict
    );

    let mut second = store.device_config(NAMESPACE, "second").unwrap();
    second.spec.node_selector = Some(labels(&[("pool", "b")]));
    store.add_device_config(second);

    for name in ["first", "second"] {
        let outcome = reconciler.reconcile(&key(name)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Reconciled(OperationResult::Created));
        assert!((metrics.reconciliation_failed(name)).abs() < f64::EPSILON);
    }

    let first = store.device_config(NAMESPACE, "first").unwrap();
    let errored = find_condition(first.conditions(), CONDITION_TYPE_ERRORED).unwrap();
    assert_eq!(errored.status, "False");
    assert_eq!(
        store.module(NAMESPACE, "second-module").unwrap().spec.selector,
        labels(&[("pool", "b")])
    );
}

#[tokio::test]
async fn test_deleted_module_is_recreated() {
    let store = InMemoryStore::new();
    let events = RecordingEventPublisher::new();
    let metrics = Metrics::new().unwrap();
    let reconciler = reconciler(&store, &events, &metrics);
    store.add_device_config(device_config(NAMESPACE, "gpu", None));
    reconciler.reconcile(&key("gpu")).await.unwrap();

    store.delete_module(NAMESPACE, "gpu-module").await.unwrap();

    let outcome = reconciler.reconcile(&key("gpu")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Reconciled(OperationResult::Created));
    assert!(store.module(NAMESPACE, "gpu-module").is_some());
}
