// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for driver rollouts.
//!
//! This module defines the Kubernetes resources the operator reads and writes.
//!
//! # Resource Types
//!
//! - [`DeviceConfig`] - User-authored driver rollout (image, version, target nodes)
//! - [`Module`] - Kernel module management resource declared for each `DeviceConfig`.
//!   The operator only writes the declaration; the kernel module controller builds
//!   and loads the driver on matching nodes.
//!
//! # Example: Creating a DeviceConfig
//!
//! ```rust,no_run
//! use device_config_operator::crd::{DeviceConfig, DeviceConfigSpec};
//!
//! let config = DeviceConfig::new(
//!     "gpu-driver",
//!     DeviceConfigSpec {
//!         driver_image: "quay.io/example/driver".to_string(),
//!         driver_version: "1.2.3".to_string(),
//!         node_selector: None,
//!     },
//! );
//!
//! // No selector set, so the vendor PCI label is targeted
//! assert_eq!(
//!     config.effective_node_selector().get("feature.node.kubernetes.io/pci-1da3.present"),
//!     Some(&"true".to_string())
//! );
//! ```

use crate::constants::{DEFAULT_NODE_SELECTOR_VALUE, PCI_VENDOR_ID};
use kube::{CustomResource, CustomResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: Ready or Errored.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `DeviceConfig` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfigStatus {
    /// Conditions representing the `DeviceConfig`'s current state.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `DeviceConfig` describes a driver rollout to a set of nodes.
///
/// For every `DeviceConfig` the operator declares exactly one kernel module
/// `Module` named `<name>-module` in the same namespace. The node selectors of
/// all `DeviceConfig`s must select disjoint sets of nodes.
///
/// # Example
///
/// ```yaml
/// apiVersion: example.com/v1alpha1
/// kind: DeviceConfig
/// metadata:
///   name: gpu-driver
///   namespace: drivers
/// spec:
///   driverImage: quay.io/example/driver
///   driverVersion: 1.2.3
///   nodeSelector:
///     node-role.kubernetes.io/worker: ""
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "example.com",
    version = "v1alpha1",
    kind = "DeviceConfig",
    namespaced,
    derive = "PartialEq",
    shortname = "dc",
    doc = "DeviceConfig describes a driver rollout. The operator declares one kernel module Module per DeviceConfig and keeps the node selectors of all DeviceConfigs disjoint.",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.driverImage"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.driverVersion"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[kube(status = "DeviceConfigStatus")]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfigSpec {
    /// Driver image repository, without tag.
    pub driver_image: String,

    /// Driver version to deploy. Combined with the node kernel release to form the image tag.
    pub driver_version: String,

    /// Label selector restricting the nodes the driver is rolled out to.
    ///
    /// Defaults to nodes advertising the vendor PCI device through node feature discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
}

/// Node feature discovery label advertising the vendor PCI device.
#[must_use]
pub fn default_node_selector_key() -> String {
    format!("feature.node.kubernetes.io/pci-{PCI_VENDOR_ID}.present")
}

impl DeviceConfig {
    /// The node selector actually used for this `DeviceConfig`.
    ///
    /// Returns the spec selector when it is set and non-empty. Otherwise returns the
    /// node feature discovery label for the vendor PCI device, so the driver is never
    /// rolled out to every schedulable node. The default is computed, never written back.
    #[must_use]
    pub fn effective_node_selector(&self) -> BTreeMap<String, String> {
        match &self.spec.node_selector {
            Some(selector) if !selector.is_empty() => selector.clone(),
            _ => BTreeMap::from([(
                default_node_selector_key(),
                DEFAULT_NODE_SELECTOR_VALUE.to_string(),
            )]),
        }
    }

    /// Conditions currently recorded in the status, empty when no status exists.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }
}

/// A single kernel release to container image mapping.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KernelMapping {
    /// Image to load on nodes whose kernel release matches `regexp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,

    /// Regular expression matched against the node kernel release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,

    /// Exact kernel release, alternative to `regexp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

/// Container settings of the module loader.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleLoaderContainerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    #[serde(default)]
    pub kernel_mappings: Vec<KernelMapping>,
}

/// Module loader settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleLoaderSpec {
    pub container: ModuleLoaderContainerSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
}

/// Kernel module management `Module`, the dependent resource of a `DeviceConfig`.
///
/// Only the fields the operator declares are modelled. The CRD itself is owned
/// and installed by the kernel module management project.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "kmm.sigs.k8s.io",
    version = "v1beta1",
    kind = "Module",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub module_loader: ModuleLoaderSpec,

    /// Nodes the module is loaded on.
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

/// Render the `DeviceConfig` CRD as YAML.
///
/// # Errors
///
/// Returns an error if the CRD cannot be serialized.
pub fn device_config_crd_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&DeviceConfig::crd())
}
