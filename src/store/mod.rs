// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access to the cluster state the reconcilers read and write.
//!
//! Every reconciler talks to the cluster through the [`ClusterStore`] trait
//! instead of a concrete `kube::Client`. The operator binary injects a
//! [`KubeStore`]; tests inject an `InMemoryStore` that records calls and can
//! be told to fail specific operations. The in-memory store is only built for
//! tests and with the `test-util` feature.
//!
//! Writes that carry the caller's copy of an object (finalizers, status) send
//! its `metadata.resourceVersion` as a precondition, so a concurrent writer
//! surfaces as [`StoreError::Conflict`](crate::errors::StoreError::Conflict)
//! instead of being silently overwritten.

pub mod api;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod pagination;

pub use self::api::KubeStore;
#[cfg(any(test, feature = "test-util"))]
pub use self::memory::InMemoryStore;

use crate::crd::{DeviceConfig, Module};
use crate::errors::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Cluster operations needed by the `DeviceConfig` reconcilers.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    // DeviceConfig
    async fn get_device_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeviceConfig, StoreError>;

    /// List every `DeviceConfig` in the watched scope.
    async fn list_device_configs(&self) -> Result<Vec<DeviceConfig>, StoreError>;

    /// Persist `metadata.finalizers` of the given object and return the stored object.
    async fn update_device_config_finalizers(
        &self,
        config: &DeviceConfig,
    ) -> Result<DeviceConfig, StoreError>;

    /// Persist the status subresource of the given object and return the stored object.
    async fn update_device_config_status(
        &self,
        config: &DeviceConfig,
    ) -> Result<DeviceConfig, StoreError>;

    // Node
    /// Names of the nodes whose labels satisfy the equality-based selector.
    async fn list_node_names(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, StoreError>;

    // Module
    async fn get_module(&self, namespace: &str, name: &str) -> Result<Module, StoreError>;
    async fn create_module(&self, module: &Module) -> Result<Module, StoreError>;

    /// Apply a JSON merge patch (RFC 7386) to a `Module`.
    async fn patch_module(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Module, StoreError>;

    async fn delete_module(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}
