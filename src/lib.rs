// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Device Configuration Operator for Kubernetes
//!
//! A Kubernetes operator that turns `DeviceConfig` resources into kernel
//! module management `Module` resources, so the right driver image is loaded
//! on every node carrying the device.
//!
//! ## Overview
//!
//! - Each `DeviceConfig` owns exactly one `Module` named `<name>-module`
//! - No two `DeviceConfig`s may select the same node
//! - A deletion finalizer guarantees the `Module` is removed before its `DeviceConfig`
//! - Progress is reported through `Ready` / `Errored` status conditions and events
//!
//! ## Modules
//!
//! - [`crd`] - `DeviceConfig` and `Module` resource types
//! - [`reconcilers`] - Reconciliation logic and its building blocks
//! - [`controller`] - kube-rs `Controller` wiring, requeue and metrics
//! - [`store`] - Cluster access behind the [`store::ClusterStore`] trait
//! - [`events`] - Kubernetes event publishing
//! - [`metrics`] - Prometheus metrics
//! - [`config`] - Command-line and environment configuration
//!
//! ## Example
//!
//! ```rust
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
//! // Without a node selector, nodes carrying the vendor's PCI device are selected
//! let selector = config.effective_node_selector();
//! assert_eq!(
//!     selector.get("feature.node.kubernetes.io/pci-1da3.present"),
//!     Some(&"true".to_string())
//! );
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod events;
pub mod leader;
pub mod metrics;
pub mod patch;
pub mod reconcilers;
pub mod selector;
pub mod server;
pub mod status_reasons;
pub mod store;
