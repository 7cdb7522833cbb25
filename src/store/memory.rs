// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterStore`] for tests.
//!
//! Objects live in maps keyed by namespace and name. The store emulates the
//! API server behaviour the reconcilers depend on:
//!
//! - every write bumps `metadata.resourceVersion`
//! - finalizer and status writes with a stale resource version fail with
//!   [`StoreError::Conflict`]
//! - a `DeviceConfig` marked for deletion disappears once its last finalizer is removed
//! - `Module` patches are applied as JSON merge patches
//!
//! Every call is recorded as a [`StoreOp`], and any operation can be made to
//! fail with [`InMemoryStore::fail`].

use super::ClusterStore;
use crate::constants::{KIND_DEVICE_CONFIG, KIND_MODULE};
use crate::crd::{DeviceConfig, Module};
use crate::errors::StoreError;
use crate::patch::apply_merge_patch;
use crate::selector::matches_labels;
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A store operation, used for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetDeviceConfig,
    ListDeviceConfigs,
    UpdateFinalizers,
    UpdateStatus,
    ListNodes,
    GetModule,
    CreateModule,
    PatchModule,
    DeleteModule,
}

type Key = (String, String);

#[derive(Default)]
struct State {
    device_configs: BTreeMap<Key, DeviceConfig>,
    modules: BTreeMap<Key, Module>,
    nodes: BTreeMap<String, BTreeMap<String, String>>,
    failures: HashMap<StoreOp, String>,
    calls: Vec<StoreOp>,
    next_version: u64,
}

impl State {
    fn next_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    /// Record the call and return the injected failure for it, if any.
    fn enter(&mut self, op: StoreOp) -> Result<(), StoreError> {
        self.calls.push(op);
        match self.failures.get(&op) {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

/// Thread-safe in-memory cluster store. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn object_key<K: ResourceExt>(obj: &K) -> Key {
    key(&obj.namespace().unwrap_or_default(), &obj.name_any())
}

fn not_found(kind: &str, (namespace, name): &Key) -> StoreError {
    StoreError::NotFound {
        kind: kind.to_string(),
        namespace: namespace.clone(),
        name: name.clone(),
    }
}

/// Fail when the caller's copy is older than the stored object.
fn check_precondition(stored: &DeviceConfig, incoming: &DeviceConfig) -> Result<(), StoreError> {
    match incoming.resource_version() {
        Some(version) if Some(&version) != stored.metadata.resource_version.as_ref() => {
            Err(StoreError::Conflict {
                kind: KIND_DEVICE_CONFIG.to_string(),
                namespace: stored.namespace().unwrap_or_default(),
                name: stored.name_any(),
                message: "the object has been modified; please apply your changes to the latest version and try again".to_string(),
            })
        }
        _ => Ok(()),
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a `DeviceConfig` (for test setup). Assigns a uid and resource version.
    pub fn add_device_config(&self, mut config: DeviceConfig) -> DeviceConfig {
        let mut state = self.lock();
        let name = config.name_any();
        config
            .metadata
            .uid
            .get_or_insert_with(|| format!("uid-{name}"));
        config.metadata.resource_version = Some(state.next_version());
        state
            .device_configs
            .insert(object_key(&config), config.clone());
        config
    }

    /// Store a `Module` (for test setup).
    pub fn add_module(&self, mut module: Module) -> Module {
        let mut state = self.lock();
        module.metadata.resource_version = Some(state.next_version());
        state.modules.insert(object_key(&module), module.clone());
        module
    }

    /// Register a node with the given labels (for test setup).
    pub fn add_node(&self, name: &str, labels: BTreeMap<String, String>) {
        self.lock().nodes.insert(name.to_string(), labels);
    }

    /// Set `metadata.deletionTimestamp` on a stored `DeviceConfig`, as the API server
    /// does when a user deletes an object that still has finalizers.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the object is not stored.
    pub fn mark_for_deletion(&self, namespace: &str, name: &str) -> Result<DeviceConfig, StoreError> {
        let mut state = self.lock();
        let version = state.next_version();
        let stored_key = key(namespace, name);
        let config = state
            .device_configs
            .get_mut(&stored_key)
            .ok_or_else(|| not_found(KIND_DEVICE_CONFIG, &stored_key))?;

        let mut metadata = serde_json::to_value(&config.metadata)?;
        metadata["deletionTimestamp"] = serde_json::Value::String(
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        );
        config.metadata = serde_json::from_value(metadata)?;
        config.metadata.resource_version = Some(version);
        Ok(config.clone())
    }

    /// Current copy of a stored `DeviceConfig`.
    #[must_use]
    pub fn device_config(&self, namespace: &str, name: &str) -> Option<DeviceConfig> {
        self.lock().device_configs.get(&key(namespace, name)).cloned()
    }

    /// Current copy of a stored `Module`.
    #[must_use]
    pub fn module(&self, namespace: &str, name: &str) -> Option<Module> {
        self.lock().modules.get(&key(namespace, name)).cloned()
    }

    /// Make every subsequent call of `op` fail with `StoreError::Unavailable(message)`.
    pub fn fail(&self, op: StoreOp, message: &str) {
        self.lock().failures.insert(op, message.to_string());
    }

    /// Stop failing `op`.
    pub fn clear_failure(&self, op: StoreOp) {
        self.lock().failures.remove(&op);
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreOp> {
        self.lock().calls.clone()
    }

    /// Number of calls of `op` made so far.
    #[must_use]
    pub fn count(&self, op: StoreOp) -> usize {
        self.lock().calls.iter().filter(|call| **call == op).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait]
impl ClusterStore for InMemoryStore {
    async fn get_device_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeviceConfig, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::GetDeviceConfig)?;
        let stored_key = key(namespace, name);
        state
            .device_configs
            .get(&stored_key)
            .cloned()
            .ok_or_else(|| not_found(KIND_DEVICE_CONFIG, &stored_key))
    }

    async fn list_device_configs(&self) -> Result<Vec<DeviceConfig>, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::ListDeviceConfigs)?;
        Ok(state.device_configs.values().cloned().collect())
    }

    async fn update_device_config_finalizers(
        &self,
        config: &DeviceConfig,
    ) -> Result<DeviceConfig, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::UpdateFinalizers)?;
        let stored_key = object_key(config);
        let version = state.next_version();

        let stored = state
            .device_configs
            .get_mut(&stored_key)
            .ok_or_else(|| not_found(KIND_DEVICE_CONFIG, &stored_key))?;
        check_precondition(stored, config)?;

        let finalizers = config.finalizers().to_vec();
        stored.metadata.finalizers = (!finalizers.is_empty()).then_some(finalizers);
        stored.metadata.resource_version = Some(version);
        let updated = stored.clone();

        if updated.metadata.deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            state.device_configs.remove(&stored_key);
        }
        Ok(updated)
    }

    async fn update_device_config_status(
        &self,
        config: &DeviceConfig,
    ) -> Result<DeviceConfig, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::UpdateStatus)?;
        let stored_key = object_key(config);
        let version = state.next_version();

        let stored = state
            .device_configs
            .get_mut(&stored_key)
            .ok_or_else(|| not_found(KIND_DEVICE_CONFIG, &stored_key))?;
        check_precondition(stored, config)?;

        stored.status.clone_from(&config.status);
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn list_node_names(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::ListNodes)?;
        Ok(state
            .nodes
            .iter()
            .filter(|(_, labels)| matches_labels(selector, labels))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn get_module(&self, namespace: &str, name: &str) -> Result<Module, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::GetModule)?;
        let stored_key = key(namespace, name);
        state
            .modules
            .get(&stored_key)
            .cloned()
            .ok_or_else(|| not_found(KIND_MODULE, &stored_key))
    }

    async fn create_module(&self, module: &Module) -> Result<Module, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::CreateModule)?;
        let stored_key = object_key(module);
        if state.modules.contains_key(&stored_key) {
            return Err(StoreError::Conflict {
                kind: KIND_MODULE.to_string(),
                namespace: stored_key.0,
                name: stored_key.1,
                message: "already exists".to_string(),
            });
        }

        let mut created = module.clone();
        created.metadata.resource_version = Some(state.next_version());
        state.modules.insert(stored_key, created.clone());
        Ok(created)
    }

    async fn patch_module(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Module, StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::PatchModule)?;
        let stored_key = key(namespace, name);
        let version = state.next_version();

        let stored = state
            .modules
            .get_mut(&stored_key)
            .ok_or_else(|| not_found(KIND_MODULE, &stored_key))?;
        let mut document = serde_json::to_value(&*stored)?;
        apply_merge_patch(&mut document, patch);
        let mut patched: Module = serde_json::from_value(document)?;
        patched.metadata.resource_version = Some(version);

        *stored = patched.clone();
        Ok(patched)
    }

    async fn delete_module(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.enter(StoreOp::DeleteModule)?;
        let stored_key = key(namespace, name);
        state
            .modules
            .remove(&stored_key)
            .map(|_| ())
            .ok_or_else(|| not_found(KIND_MODULE, &stored_key))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
