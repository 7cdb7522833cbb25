// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the device configuration operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `DeviceConfig` CRD
pub const API_GROUP: &str = "example.com";

/// API version for the `DeviceConfig` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "example.com/v1alpha1";

/// Kind name for `DeviceConfig` resource
pub const KIND_DEVICE_CONFIG: &str = "DeviceConfig";

/// API group of the kernel module management `Module` resource
pub const MODULE_API_GROUP: &str = "kmm.sigs.k8s.io";

/// Kind name for the kernel module management `Module` resource
pub const KIND_MODULE: &str = "Module";

/// Kind name for core `Node` resources
pub const KIND_NODE: &str = "Node";

// ============================================================================
// DeviceConfig Constants
// ============================================================================

/// Finalizer guarding `DeviceConfig` deletion until its `Module` is gone
pub const DEVICE_CONFIG_DELETION_FINALIZER: &str = "device-config-deletion-finalizer";

/// PCI vendor ID of the device the default node selector targets
pub const PCI_VENDOR_ID: &str = "1da3";

/// Value of the synthesized default node selector label
pub const DEFAULT_NODE_SELECTOR_VALUE: &str = "true";

// ============================================================================
// Module Constants
// ============================================================================

/// Suffix appended to the `DeviceConfig` name to derive the `Module` name
pub const MODULE_NAME_SUFFIX: &str = "module";

/// `ServiceAccount` the module loader runs as
pub const DRIVER_SERVICE_ACCOUNT: &str = "driver-sample";

/// Image pull policy for the driver container
pub const DRIVER_IMAGE_PULL_POLICY: &str = "Always";

/// Placeholder the kernel module controller replaces with the node's kernel release
pub const KERNEL_FULL_VERSION_TOKEN: &str = "${KERNEL_FULL_VERSION}";

/// Kernel release pattern matched by the single kernel mapping (EL-style kernels)
pub const KERNEL_VERSION_REGEXP: &str = r"^.*\.el\d_?\d?\..*$";

// ============================================================================
// Event Constants
// ============================================================================

/// Default reporting controller name for Kubernetes events
pub const DEFAULT_EVENT_REPORTER: &str = "deviceconfig-controller";

/// Event reason for reconciliation failures
pub const EVENT_REASON_ERROR: &str = "Error";

/// Event reason for a successful reconciliation
pub const EVENT_REASON_RECONCILED: &str = "Reconciled";

/// Event note emitted when node selectors of two `DeviceConfig`s overlap
pub const EVENT_NOTE_CONFLICTING_NODE_SELECTORS: &str =
    "Conflicting DeviceConfig NodeSelectors found. Please add or update this DeviceConfig's NodeSelector accordingly.";

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// First requeue delay after a failed reconciliation (5 seconds)
pub const ERROR_REQUEUE_INITIAL_SECS: u64 = 5;

/// Upper bound for the requeue delay after repeated failures (5 minutes)
pub const ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Requeue delay growth factor per consecutive failure
pub const ERROR_REQUEUE_MULTIPLIER: f64 = 2.0;

/// Jitter applied to requeue delays (±10%)
pub const ERROR_REQUEUE_RANDOMIZATION_FACTOR: f64 = 0.1;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default Lease name used for leader election
pub const DEFAULT_LEADER_ELECTION_ID: &str = "e436e148.example.com";

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election grace period (2 seconds)
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 2;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Environment variable holding the namespace to watch
pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the Prometheus metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default bind address for the health probe HTTP server
pub const DEFAULT_HEALTH_PROBE_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness probe
pub const HEALTHZ_PATH: &str = "/healthz";

/// Path for the readiness probe
pub const READYZ_PATH: &str = "/readyz";

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for paginated list calls against the API server
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;
