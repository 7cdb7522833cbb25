// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `memory.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{DeviceConfig, DeviceConfigSpec, Module, ModuleSpec};
    use crate::errors::StoreError;
    use crate::store::memory::{InMemoryStore, StoreOp};
    use crate::store::ClusterStore;
    use kube::ResourceExt;
    use serde_json::json;
    use std::collections::BTreeMap;

    const NAMESPACE: &str = "drivers";

    fn device_config(name: &str) -> DeviceConfig {
        let mut config = DeviceConfig::new(
            name,
            DeviceConfigSpec {
                driver_image: "driver".into(),
                driver_version: "test".into(),
                node_selector: None,
            },
        );
        config.metadata.namespace = Some(NAMESPACE.into());
        config
    }

    fn module(name: &str) -> Module {
        let mut module = Module::new(name, ModuleSpec::default());
        module.metadata.namespace = Some(NAMESPACE.into());
        module
    }

    #[tokio::test]
    async fn test_get_missing_device_config_is_not_found() {
        let store = InMemoryStore::new();

        let err = store.get_device_config(NAMESPACE, "missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.calls(), vec![StoreOp::GetDeviceConfig]);
    }

    #[tokio::test]
    async fn test_add_assigns_uid_and_version() {
        let store = InMemoryStore::new();

        let stored = store.add_device_config(device_config("a"));
        assert_eq!(stored.uid().as_deref(), Some("uid-a"));
        assert!(stored.resource_version().is_some());
    }

    #[tokio::test]
    async fn test_stale_status_write_conflicts() {
        let store = InMemoryStore::new();
        let stale = store.add_device_config(device_config("a"));

        // Someone else writes first
        let fresh = store
            .update_device_config_finalizers(&stale)
            .await
            .unwrap();
        assert_ne!(fresh.resource_version(), stale.resource_version());

        let err = store.update_device_config_status(&stale).await.unwrap_err();
        assert!(err.is_conflict());

        assert!(store.update_device_config_status(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_finalizer_removal_completes_deletion() {
        let store = InMemoryStore::new();
        let mut config = device_config("a");
        config.metadata.finalizers = Some(vec!["device-config-deletion-finalizer".into()]);
        store.add_device_config(config);

        let mut deleting = store.mark_for_deletion(NAMESPACE, "a").unwrap();
        assert!(deleting.metadata.deletion_timestamp.is_some());

        deleting.metadata.finalizers = None;
        store
            .update_device_config_finalizers(&deleting)
            .await
            .unwrap();

        assert!(store.device_config(NAMESPACE, "a").is_none());
    }

    #[tokio::test]
    async fn test_list_node_names_filters_by_labels() {
        let store = InMemoryStore::new();
        store.add_node("n1", BTreeMap::from([("gpu".into(), "true".into())]));
        store.add_node("n2", BTreeMap::from([("gpu".into(), "false".into())]));
        store.add_node("n3", BTreeMap::new());

        let selector = BTreeMap::from([("gpu".to_string(), "true".to_string())]);
        let names = store.list_node_names(&selector).await.unwrap();

        assert_eq!(names, vec!["n1".to_string()]);
    }

    #[tokio::test]
    async fn test_create_existing_module_conflicts() {
        let store = InMemoryStore::new();
        store.add_module(module("a-module"));

        let err = store.create_module(&module("a-module")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_patch_module_applies_merge_patch() {
        let store = InMemoryStore::new();
        store.add_module(module("a-module"));

        let patched = store
            .patch_module(
                NAMESPACE,
                "a-module",
                &json!({"spec": {"selector": {"gpu": "true"}}}),
            )
            .await
            .unwrap();

        assert_eq!(
            patched.spec.selector.get("gpu").map(String::as_str),
            Some("true")
        );
        assert_eq!(store.module(NAMESPACE, "a-module").unwrap(), patched);
    }

    #[tokio::test]
    async fn test_delete_missing_module_is_not_found() {
        let store = InMemoryStore::new();

        let err = store.delete_module(NAMESPACE, "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failure_until_cleared() {
        let store = InMemoryStore::new();
        store.fail(StoreOp::ListDeviceConfigs, "etcd timeout");

        let err = store.list_device_configs().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(ref m) if m == "etcd timeout"));

        store.clear_failure(StoreOp::ListDeviceConfigs);
        assert!(store.list_device_configs().await.unwrap().is_empty());
        assert_eq!(store.count(StoreOp::ListDeviceConfigs), 2);
    }
}
