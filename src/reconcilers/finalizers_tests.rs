// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::constants::DEVICE_CONFIG_DELETION_FINALIZER;
    use crate::crd::{DeviceConfig, DeviceConfigSpec};
    use crate::reconcilers::finalizers::{contains_deletion_finalizer, DeletionFinalizerUpdater};
    use crate::store::memory::{InMemoryStore, StoreOp};
    use kube::ResourceExt;
    use std::sync::Arc;

    const NAMESPACE: &str = "drivers";
    const NAME: &str = "a-device-config";

    fn config_with_finalizers(finalizers: Option<Vec<String>>) -> DeviceConfig {
        let mut config = DeviceConfig::new(
            NAME,
            DeviceConfigSpec {
                driver_image: "driver".into(),
                driver_version: "test".into(),
                node_selector: None,
            },
        );
        config.metadata.namespace = Some(NAMESPACE.into());
        config.metadata.finalizers = finalizers;
        config
    }

    fn updater(store: &InMemoryStore) -> DeletionFinalizerUpdater {
        DeletionFinalizerUpdater::new(Arc::new(store.clone()))
    }

    #[test]
    fn test_contains_deletion_finalizer() {
        assert!(!contains_deletion_finalizer(&config_with_finalizers(None)));
        assert!(!contains_deletion_finalizer(&config_with_finalizers(Some(vec![
            "other".into()
        ]))));
        assert!(contains_deletion_finalizer(&config_with_finalizers(Some(vec![
            "other".into(),
            DEVICE_CONFIG_DELETION_FINALIZER.into(),
        ]))));
    }

    #[tokio::test]
    async fn test_add_deletion_finalizer_persists() {
        let store = InMemoryStore::new();
        let mut config = store.add_device_config(config_with_finalizers(None));

        updater(&store)
            .add_deletion_finalizer(&mut config)
            .await
            .unwrap();

        let stored = store.device_config(NAMESPACE, NAME).unwrap();
        assert_eq!(stored.finalizers(), [DEVICE_CONFIG_DELETION_FINALIZER]);
        assert_eq!(config.resource_version(), stored.resource_version());
    }

    #[tokio::test]
    async fn test_add_existing_finalizer_is_noop() {
        let store = InMemoryStore::new();
        let mut config = store.add_device_config(config_with_finalizers(Some(vec![
            DEVICE_CONFIG_DELETION_FINALIZER.into(),
        ])));

        updater(&store)
            .add_deletion_finalizer(&mut config)
            .await
            .unwrap();

        assert_eq!(config.finalizers().len(), 1);
        assert_eq!(store.count(StoreOp::UpdateFinalizers), 0);
    }

    #[tokio::test]
    async fn test_remove_deletion_finalizer_keeps_others() {
        let store = InMemoryStore::new();
        let mut config = store.add_device_config(config_with_finalizers(Some(vec![
            "other".into(),
            DEVICE_CONFIG_DELETION_FINALIZER.into(),
        ])));

        updater(&store)
            .remove_deletion_finalizer(&mut config)
            .await
            .unwrap();

        let stored = store.device_config(NAMESPACE, NAME).unwrap();
        assert_eq!(stored.finalizers(), ["other"]);
    }

    #[tokio::test]
    async fn test_remove_absent_finalizer_is_noop() {
        let store = InMemoryStore::new();
        let mut config = store.add_device_config(config_with_finalizers(None));

        updater(&store)
            .remove_deletion_finalizer(&mut config)
            .await
            .unwrap();

        assert_eq!(store.count(StoreOp::UpdateFinalizers), 0);
    }

    #[tokio::test]
    async fn test_add_failure_is_wrapped() {
        let store = InMemoryStore::new();
        let mut config = store.add_device_config(config_with_finalizers(None));
        store.fail(StoreOp::UpdateFinalizers, "api down");

        let err = updater(&store)
            .add_deletion_finalizer(&mut config)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to add deletion finalizer for a-device-config: store unavailable: api down"
        );
    }

    #[tokio::test]
    async fn test_remove_failure_is_wrapped() {
        let store = InMemoryStore::new();
        let mut config = store.add_device_config(config_with_finalizers(Some(vec![
            DEVICE_CONFIG_DELETION_FINALIZER.into(),
        ])));
        store.fail(StoreOp::UpdateFinalizers, "api down");

        let err = updater(&store)
            .remove_deletion_finalizer(&mut config)
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .starts_with("failed to remove deletion finalizer for a-device-config"));
    }
}
