// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster-wide node selector conflict detection.
//!
//! Two `DeviceConfig`s must never select the same node, otherwise two driver
//! `Module`s would compete for it. The check is global: every `DeviceConfig`
//! in the watched scope is resolved to its node set on every call, and any node
//! selected twice anywhere fails the check, even when the `DeviceConfig` being
//! reconciled is not one of the overlapping pair.

use crate::crd::DeviceConfig;
use crate::errors::ReconcileError;
use crate::store::ClusterStore;
use kube::ResourceExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Return the first name that occurs more than once.
fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut visited = HashSet::with_capacity(names.len());
    names
        .iter()
        .find(|name| !visited.insert(name.as_str()))
        .map(String::as_str)
}

/// Detects overlapping node selectors across all `DeviceConfig`s.
#[derive(Clone)]
pub struct NodeSelectorValidator {
    store: Arc<dyn ClusterStore>,
}

impl NodeSelectorValidator {
    #[must_use]
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Fail if any node is selected by more than one `DeviceConfig`.
    ///
    /// Each `DeviceConfig` is resolved through its effective node selector. The
    /// stored specs are never modified.
    ///
    /// # Errors
    ///
    /// - `ConflictingNodeSelector` naming `config` when a node is selected twice
    /// - the store error when listing `DeviceConfig`s or nodes fails
    pub async fn check_device_config_for_conflicting_node_selector(
        &self,
        config: &DeviceConfig,
    ) -> Result<(), ReconcileError> {
        let device_configs = self.store.list_device_configs().await?;

        let mut names = Vec::new();
        for device_config in &device_configs {
            let selector = device_config.effective_node_selector();
            let nodes = self.store.list_node_names(&selector).await?;
            debug!(
                device_config = %device_config.name_any(),
                nodes = nodes.len(),
                "Resolved DeviceConfig node selector"
            );
            names.extend(nodes);
        }

        match first_duplicate(&names) {
            Some(node) => {
                debug!(
                    node = %node,
                    device_config = %config.name_any(),
                    "Node selected by more than one DeviceConfig"
                );
                Err(ReconcileError::ConflictingNodeSelector {
                    name: config.name_any(),
                })
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "nodeselector_tests.rs"]
mod nodeselector_tests;
