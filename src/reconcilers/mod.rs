// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for `DeviceConfig` resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `DeviceConfig` changes and changes to owned `Module`s
//! 2. **Reconcile** - Compare the declared driver with the `Module` in the cluster
//! 3. **Update** - Create, patch or delete the `Module`
//! 4. **Status** - Report the result as `Ready` / `Errored` conditions and events
//!
//! # Components
//!
//! - [`DeviceConfigReconciler`] - One reconciliation pass, composing the parts below
//! - [`ModuleReconciler`] - Creates, patches and deletes the owned `Module`
//! - [`NodeSelectorValidator`] - Rejects `DeviceConfig`s whose selectors overlap
//! - [`StatusConditionUpdater`] - Writes the `Ready` / `Errored` condition pair
//! - [`DeletionFinalizerUpdater`] - Guards `Module` cleanup with a finalizer
//! - [`RequeueBackoff`] - Per-object retry delays after failures
//!
//! # Example
//!
//! ```rust,no_run
//! use device_config_operator::crd::DeviceConfig;
//! use device_config_operator::events::RecordingEventPublisher;
//! use device_config_operator::metrics::Metrics;
//! use device_config_operator::reconcilers::DeviceConfigReconciler;
//! use device_config_operator::store::InMemoryStore;
//! use kube::runtime::reflector::ObjectRef;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let reconciler = DeviceConfigReconciler::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(RecordingEventPublisher::new()),
//!     Metrics::new()?,
//! );
//! let outcome = reconciler
//!     .reconcile(&ObjectRef::<DeviceConfig>::new("gpu-driver").within("drivers"))
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod deviceconfig;
pub mod finalizers;
pub mod module;
pub mod nodeselector;
pub mod retry;
pub mod status;

pub use deviceconfig::{DeviceConfigReconciler, ReconcileOutcome};
pub use finalizers::DeletionFinalizerUpdater;
pub use module::{ModuleReconciler, OperationResult};
pub use nodeselector::NodeSelectorValidator;
pub use retry::RequeueBackoff;
pub use status::StatusConditionUpdater;
