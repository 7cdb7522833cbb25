// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `controller.rs`

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::controller::{error_policy, forget_device_config, reconcile};
    use crate::crd::{DeviceConfig, DeviceConfigSpec};
    use crate::errors::{ReconcileError, StoreError};
    use crate::events::RecordingEventPublisher;
    use crate::metrics::Metrics;
    use crate::store::memory::{InMemoryStore, StoreOp};
    use kube::runtime::controller::Action;
    use kube::runtime::reflector::ObjectRef;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (InMemoryStore, Arc<Context>, Arc<DeviceConfig>) {
        let store = InMemoryStore::new();
        let mut config = DeviceConfig::new(
            "a",
            DeviceConfigSpec {
                driver_image: "driver".into(),
                driver_version: "test".into(),
                node_selector: None,
            },
        );
        config.metadata.namespace = Some("drivers".into());
        let config = store.add_device_config(config);

        let ctx = Arc::new(Context::new(
            Arc::new(store.clone()),
            Arc::new(RecordingEventPublisher::new()),
            Metrics::new().unwrap(),
        ));
        (store, ctx, Arc::new(config))
    }

    #[tokio::test]
    async fn test_success_awaits_change() {
        let (_store, ctx, config) = setup();

        let action = reconcile(config, ctx.clone()).await.unwrap();

        assert_eq!(action, Action::await_change());
        let rendered = ctx.metrics.gather().unwrap();
        assert!(rendered.contains("outcome=\"reconciled\""));
    }

    #[tokio::test]
    async fn test_failure_is_returned_and_counted() {
        let (store, ctx, config) = setup();
        store.fail(StoreOp::CreateModule, "quota exceeded");

        reconcile(config, ctx.clone()).await.unwrap_err();

        let rendered = ctx.metrics.gather().unwrap();
        assert!(rendered.contains("outcome=\"error\""));
    }

    #[tokio::test]
    async fn test_error_policy_backs_off_and_success_resets() {
        let (_store, ctx, config) = setup();
        let err = ReconcileError::Store(StoreError::Unavailable("api down".into()));

        let first = error_policy(config.clone(), &err, ctx.clone());
        let second = error_policy(config.clone(), &err, ctx.clone());
        assert_ne!(first, second);

        reconcile(config.clone(), ctx.clone()).await.unwrap();

        let delay = ctx
            .backoff
            .next_delay(&ObjectRef::from_obj(config.as_ref()));
        assert!(delay <= Duration::from_millis(5500));
    }

    #[tokio::test]
    async fn test_error_policy_forgets_vanished_device_config() {
        let (_store, ctx, config) = setup();
        let unavailable = ReconcileError::Store(StoreError::Unavailable("api down".into()));
        let _ = error_policy(config.clone(), &unavailable, ctx.clone());
        ctx.metrics.set_reconciliation_failed("a", true);
        assert_eq!(ctx.backoff.tracked(), 1);

        let gone = ReconcileError::Finalizer {
            action: "add",
            name: "a".into(),
            source: StoreError::NotFound {
                kind: "DeviceConfig".into(),
                namespace: "drivers".into(),
                name: "a".into(),
            },
        };
        let action = error_policy(config, &gone, ctx.clone());

        assert_eq!(action, Action::await_change());
        assert_eq!(ctx.backoff.tracked(), 0);
        assert!(!ctx.metrics.gather().unwrap().contains("device_config=\"a\""));
    }

    #[tokio::test]
    async fn test_forget_device_config_drops_backoff_state() {
        let (_store, ctx, config) = setup();
        let err = ReconcileError::Store(StoreError::Unavailable("api down".into()));
        let _ = error_policy(config.clone(), &err, ctx.clone());
        let _ = error_policy(config, &err, ctx.clone());

        forget_device_config(&ctx, "other", Some("drivers"));
        assert_eq!(ctx.backoff.tracked(), 1);

        forget_device_config(&ctx, "a", Some("drivers"));
        assert_eq!(ctx.backoff.tracked(), 0);
    }
}
