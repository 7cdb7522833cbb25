// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`ClusterStore`] backed by the Kubernetes API server.

use super::pagination::list_all_paginated;
use super::ClusterStore;
use crate::constants::{KIND_DEVICE_CONFIG, KIND_MODULE, KIND_NODE};
use crate::crd::{DeviceConfig, Module};
use crate::errors::StoreError;
use crate::selector::to_label_selector;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Cluster store talking to the API server through a `kube::Client`.
///
/// `DeviceConfig` listing is restricted to `watch_namespace` when one is set;
/// otherwise every namespace is listed. Nodes are cluster-scoped and always
/// listed cluster-wide.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    watch_namespace: Option<String>,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client, watch_namespace: Option<String>) -> Self {
        Self {
            client,
            watch_namespace,
        }
    }

    fn device_configs(&self, namespace: &str) -> Api<DeviceConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn modules(&self, namespace: &str) -> Api<Module> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Build `{"metadata": {"resourceVersion": ..., <extra>}}` with the precondition
/// only present when the caller's copy has a resource version.
fn metadata_patch(config: &DeviceConfig, extra: Option<(&str, Value)>) -> Value {
    let mut metadata = Map::new();
    if let Some(version) = config.resource_version() {
        metadata.insert("resourceVersion".to_string(), Value::String(version));
    }
    if let Some((key, value)) = extra {
        metadata.insert(key.to_string(), value);
    }
    json!({ "metadata": metadata })
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_device_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeviceConfig, StoreError> {
        self.device_configs(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, KIND_DEVICE_CONFIG, namespace, name))
    }

    async fn list_device_configs(&self) -> Result<Vec<DeviceConfig>, StoreError> {
        let api: Api<DeviceConfig> = match &self.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        list_all_paginated(&api, ListParams::default())
            .await
            .map_err(StoreError::Kube)
    }

    async fn update_device_config_finalizers(
        &self,
        config: &DeviceConfig,
    ) -> Result<DeviceConfig, StoreError> {
        let namespace = config.namespace().unwrap_or_default();
        let name = config.name_any();
        let patch = metadata_patch(config, Some(("finalizers", json!(config.finalizers()))));

        debug!(namespace = %namespace, name = %name, "Patching DeviceConfig finalizers");
        self.device_configs(&namespace)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(e, KIND_DEVICE_CONFIG, &namespace, &name))
    }

    async fn update_device_config_status(
        &self,
        config: &DeviceConfig,
    ) -> Result<DeviceConfig, StoreError> {
        let namespace = config.namespace().unwrap_or_default();
        let name = config.name_any();
        let mut patch = metadata_patch(config, None);
        patch["status"] = json!(config.status);

        debug!(namespace = %namespace, name = %name, "Patching DeviceConfig status");
        self.device_configs(&namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(e, KIND_DEVICE_CONFIG, &namespace, &name))
    }

    async fn list_node_names(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, StoreError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let params = ListParams::default().labels(&to_label_selector(selector));
        let nodes = list_all_paginated(&api, params)
            .await
            .map_err(|e| StoreError::from_kube(e, KIND_NODE, "", ""))?;
        Ok(nodes.iter().map(ResourceExt::name_any).collect())
    }

    async fn get_module(&self, namespace: &str, name: &str) -> Result<Module, StoreError> {
        self.modules(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, KIND_MODULE, namespace, name))
    }

    async fn create_module(&self, module: &Module) -> Result<Module, StoreError> {
        let namespace = module.namespace().unwrap_or_default();
        let name = module.name_any();
        self.modules(&namespace)
            .create(&PostParams::default(), module)
            .await
            .map_err(|e| StoreError::from_kube(e, KIND_MODULE, &namespace, &name))
    }

    async fn patch_module(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Module, StoreError> {
        self.modules(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| StoreError::from_kube(e, KIND_MODULE, namespace, name))
    }

    async fn delete_module(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.modules(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| StoreError::from_kube(e, KIND_MODULE, namespace, name))
    }
}
