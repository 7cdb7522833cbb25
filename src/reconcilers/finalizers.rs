// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deletion finalizer management for `DeviceConfig` resources.
//!
//! The finalizer keeps a deleted `DeviceConfig` around until its `Module` has
//! been removed. It is added before the `Module` is first created, so a
//! `Module` can never outlive the `DeviceConfig` that declared it.
//!
//! Adding a finalizer that is already present or removing one that is absent
//! is a no-op and issues no write.

use crate::constants::DEVICE_CONFIG_DELETION_FINALIZER;
use crate::crd::DeviceConfig;
use crate::errors::ReconcileError;
use crate::store::ClusterStore;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Check whether the `DeviceConfig` carries the deletion finalizer.
#[must_use]
pub fn contains_deletion_finalizer(config: &DeviceConfig) -> bool {
    config
        .finalizers()
        .iter()
        .any(|f| f == DEVICE_CONFIG_DELETION_FINALIZER)
}

/// Adds and removes the `DeviceConfig` deletion finalizer.
#[derive(Clone)]
pub struct DeletionFinalizerUpdater {
    store: Arc<dyn ClusterStore>,
}

impl DeletionFinalizerUpdater {
    #[must_use]
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Check whether the `DeviceConfig` carries the deletion finalizer.
    #[must_use]
    pub fn contains_deletion_finalizer(&self, config: &DeviceConfig) -> bool {
        contains_deletion_finalizer(config)
    }

    /// Add the deletion finalizer and persist it.
    ///
    /// # Errors
    ///
    /// Returns `failed to add deletion finalizer for <name>: <cause>` when the write fails.
    pub async fn add_deletion_finalizer(
        &self,
        config: &mut DeviceConfig,
    ) -> Result<(), ReconcileError> {
        if contains_deletion_finalizer(config) {
            return Ok(());
        }

        info!(
            namespace = %config.namespace().unwrap_or_default(),
            name = %config.name_any(),
            finalizer = DEVICE_CONFIG_DELETION_FINALIZER,
            "Adding finalizer to DeviceConfig"
        );
        config
            .finalizers_mut()
            .push(DEVICE_CONFIG_DELETION_FINALIZER.to_string());
        self.persist(config, "add").await
    }

    /// Remove the deletion finalizer and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `failed to remove deletion finalizer for <name>: <cause>` when the write fails.
    pub async fn remove_deletion_finalizer(
        &self,
        config: &mut DeviceConfig,
    ) -> Result<(), ReconcileError> {
        if !contains_deletion_finalizer(config) {
            return Ok(());
        }

        info!(
            namespace = %config.namespace().unwrap_or_default(),
            name = %config.name_any(),
            finalizer = DEVICE_CONFIG_DELETION_FINALIZER,
            "Removing finalizer from DeviceConfig"
        );
        config
            .finalizers_mut()
            .retain(|f| f != DEVICE_CONFIG_DELETION_FINALIZER);
        self.persist(config, "remove").await
    }

    async fn persist(
        &self,
        config: &mut DeviceConfig,
        action: &'static str,
    ) -> Result<(), ReconcileError> {
        let updated = self
            .store
            .update_device_config_finalizers(config)
            .await
            .map_err(|source| ReconcileError::Finalizer {
                action,
                name: config.name_any(),
                source,
            })?;
        config.metadata.resource_version = updated.metadata.resource_version;
        Ok(())
    }
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
