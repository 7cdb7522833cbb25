// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DeviceConfig` reconciliation.
//!
//! One pass over a `DeviceConfig` runs these steps in order and stops at the
//! first one that decides the outcome:
//!
//! 1. Fetch the `DeviceConfig`. A missing object needs no work.
//! 2. A `DeviceConfig` being deleted has its `Module` removed, then its
//!    deletion finalizer released.
//! 3. Node selector conflicts are reported through an event, the status and
//!    the failure gauge, but are not retried: the user has to fix the selector.
//! 4. The deletion finalizer is persisted before any `Module` exists.
//! 5. The `Module` is created or patched.
//! 6. The `Ready` condition is recorded.
//!
//! Every pass re-reads the cluster, so running it again after success makes
//! no further writes.

use crate::constants::{
    EVENT_NOTE_CONFLICTING_NODE_SELECTORS, EVENT_REASON_ERROR, EVENT_REASON_RECONCILED,
};
use crate::crd::DeviceConfig;
use crate::errors::ReconcileError;
use crate::events::{EventPublisher, EventSeverity};
use crate::metrics::Metrics;
use crate::reconcilers::finalizers::DeletionFinalizerUpdater;
use crate::reconcilers::module::{ModuleReconciler, OperationResult};
use crate::reconcilers::nodeselector::NodeSelectorValidator;
use crate::reconcilers::status::StatusConditionUpdater;
use crate::status_reasons::{
    MESSAGE_RECONCILED, REASON_CONFLICTING_NODE_SELECTOR, REASON_MODULE_FAILED, REASON_RECONCILED,
};
use crate::store::ClusterStore;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a reconciliation pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The `DeviceConfig` no longer exists.
    NotFound,
    /// The `DeviceConfig` is being deleted and holds no finalizer of ours.
    AlreadyFinalized,
    /// The `Module` was deleted and the finalizer released.
    Finalized,
    /// The node selector overlaps another `DeviceConfig`.
    Conflict,
    /// The `Module` matches the `DeviceConfig` and the status says `Ready`.
    Reconciled(OperationResult),
}

impl ReconcileOutcome {
    /// Short label used in logs and the `outcome` metric label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyFinalized | Self::Finalized => "finalized",
            Self::Conflict => "conflict",
            Self::Reconciled(_) => "reconciled",
        }
    }
}

/// Drives a `DeviceConfig` and its `Module` to the declared state.
#[derive(Clone)]
pub struct DeviceConfigReconciler {
    store: Arc<dyn ClusterStore>,
    events: Arc<dyn EventPublisher>,
    metrics: Metrics,
    modules: ModuleReconciler,
    finalizers: DeletionFinalizerUpdater,
    conditions: StatusConditionUpdater,
    validator: NodeSelectorValidator,
}

impl DeviceConfigReconciler {
    #[must_use]
    pub fn new(
        store: Arc<dyn ClusterStore>,
        events: Arc<dyn EventPublisher>,
        metrics: Metrics,
    ) -> Self {
        Self {
            modules: ModuleReconciler::new(store.clone()),
            finalizers: DeletionFinalizerUpdater::new(store.clone()),
            conditions: StatusConditionUpdater::new(store.clone()),
            validator: NodeSelectorValidator::new(store.clone()),
            store,
            events,
            metrics,
        }
    }

    /// Run one reconciliation pass for the `DeviceConfig` identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the pass must be retried: a store failure, a
    /// failed `Module` upsert or deletion, or a failed finalizer or status write.
    pub async fn reconcile(
        &self,
        key: &ObjectRef<DeviceConfig>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let namespace = key.namespace.clone().unwrap_or_default();
        let name = key.name.clone();

        let mut config = match self.store.get_device_config(&namespace, &name).await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                self.metrics.remove_device_config(&name);
                info!(
                    namespace = %namespace,
                    name = %name,
                    "DeviceConfig not found, it may have been deleted"
                );
                return Ok(ReconcileOutcome::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        if config.metadata.deletion_timestamp.is_some() {
            return self.finalize(&mut config).await;
        }

        match self
            .validator
            .check_device_config_for_conflicting_node_selector(&config)
            .await
        {
            Ok(()) => {}
            Err(e @ ReconcileError::ConflictingNodeSelector { .. }) => {
                self.report_conflict(&mut config, &e).await;
                return Ok(ReconcileOutcome::Conflict);
            }
            Err(e) => return Err(e),
        }

        self.finalizers.add_deletion_finalizer(&mut config).await?;

        let result = match self.modules.reconcile_module(&config).await {
            Ok(result) => result,
            Err(e) => return Err(self.report_module_failure(&mut config, e).await),
        };
        self.metrics.record_module_operation(result.as_str());

        self.metrics.set_reconciliation_failed(&name, false);
        self.events
            .publish(
                &config,
                EventSeverity::Normal,
                EVENT_REASON_RECONCILED,
                &format!("Successfully reconciled DeviceConfig {namespace}/{name}"),
            )
            .await;
        self.conditions
            .set_conditions_ready(&mut config, REASON_RECONCILED, MESSAGE_RECONCILED)
            .await?;

        Ok(ReconcileOutcome::Reconciled(result))
    }

    async fn finalize(
        &self,
        config: &mut DeviceConfig,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.metrics.set_reconciliation_failed(&config.name_any(), false);

        if !self.finalizers.contains_deletion_finalizer(config) {
            debug!(
                namespace = %config.namespace().unwrap_or_default(),
                name = %config.name_any(),
                "DeviceConfig being deleted holds no deletion finalizer"
            );
            self.metrics.remove_device_config(&config.name_any());
            return Ok(ReconcileOutcome::AlreadyFinalized);
        }

        info!(
            namespace = %config.namespace().unwrap_or_default(),
            name = %config.name_any(),
            "Deleting resources of DeviceConfig"
        );
        self.modules
            .delete_module(config)
            .await
            .map_err(|e| ReconcileError::Cleanup(Box::new(e)))?;
        self.metrics.record_module_operation("deleted");

        self.finalizers.remove_deletion_finalizer(config).await?;
        self.metrics.remove_device_config(&config.name_any());
        Ok(ReconcileOutcome::Finalized)
    }

    async fn report_conflict(&self, config: &mut DeviceConfig, err: &ReconcileError) {
        error!(
            namespace = %config.namespace().unwrap_or_default(),
            name = %config.name_any(),
            error = %err,
            "DeviceConfig node selector overlaps another DeviceConfig"
        );
        self.events
            .publish(
                config,
                EventSeverity::Warning,
                EVENT_REASON_ERROR,
                EVENT_NOTE_CONFLICTING_NODE_SELECTORS,
            )
            .await;
        self.metrics.set_reconciliation_failed(&config.name_any(), true);

        if let Err(status_err) = self
            .conditions
            .set_conditions_errored(config, REASON_CONFLICTING_NODE_SELECTOR, &err.to_string())
            .await
        {
            warn!(
                namespace = %config.namespace().unwrap_or_default(),
                name = %config.name_any(),
                error = %status_err,
                "Failed to record node selector conflict in status"
            );
        }
    }

    /// Record a failed `Module` upsert in the status and return the error to surface.
    async fn report_module_failure(
        &self,
        config: &mut DeviceConfig,
        err: ReconcileError,
    ) -> ReconcileError {
        error!(
            namespace = %config.namespace().unwrap_or_default(),
            name = %config.name_any(),
            error = %err,
            "Failed to reconcile Module"
        );
        self.metrics.set_reconciliation_failed(&config.name_any(), true);

        match self
            .conditions
            .set_conditions_errored(config, REASON_MODULE_FAILED, &err.to_string())
            .await
        {
            Ok(()) => err,
            Err(status_err) => ReconcileError::StatusUpdate {
                cause: Box::new(err),
                status: Box::new(status_err),
            },
        }
    }
}

#[cfg(test)]
#[path = "deviceconfig_tests.rs"]
mod deviceconfig_tests;
