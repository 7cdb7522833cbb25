// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers and the `DeviceConfig` condition updater.
//!
//! A `DeviceConfig` reports two conditions that are always written together:
//! `Ready` and `Errored`. Conditions are upserted by type, so the list never
//! holds two entries of the same type and the first insertion fixes the order.
//!
//! # Condition Format
//!
//! - `type`: `Ready` or `Errored`
//! - `status`: "True" or "False"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp of the last change of `status`
//!
//! # Example
//!
//! ```rust
//! use device_config_operator::reconcilers::status::{create_condition, set_condition};
//!
//! let mut conditions = Vec::new();
//! set_condition(&mut conditions, create_condition("Ready", "True", "Reconciled", None));
//! set_condition(&mut conditions, create_condition("Ready", "True", "Reconciled", Some("again")));
//!
//! assert_eq!(conditions.len(), 1);
//! assert_eq!(conditions[0].message.as_deref(), Some("again"));
//! ```

use crate::crd::{Condition, DeviceConfig, DeviceConfigStatus};
use crate::errors::ReconcileError;
use crate::status_reasons::{
    CONDITION_TYPE_ERRORED, CONDITION_TYPE_READY, STATUS_FALSE, STATUS_TRUE,
};
use crate::store::ClusterStore;
use chrono::Utc;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

/// Create a new condition stamped with the current time.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: Option<&str>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: message.map(str::to_string),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Upsert a condition by type.
///
/// An existing entry is updated in place and keeps its `lastTransitionTime`
/// unless its status changes. A new type is appended.
pub fn set_condition(conditions: &mut Vec<Condition>, new_condition: Condition) {
    match conditions
        .iter_mut()
        .find(|c| c.r#type == new_condition.r#type)
    {
        Some(existing) => {
            if existing.status != new_condition.status || existing.last_transition_time.is_none() {
                existing.status = new_condition.status;
                existing.last_transition_time = new_condition.last_transition_time;
            }
            existing.reason = new_condition.reason;
            existing.message = new_condition.message;
        }
        None => conditions.push(new_condition),
    }
}

/// Writes the `Ready` / `Errored` condition pair to the status subresource.
#[derive(Clone)]
pub struct StatusConditionUpdater {
    store: Arc<dyn ClusterStore>,
}

impl StatusConditionUpdater {
    #[must_use]
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Set `Ready=True` with the given reason and message, and `Errored=False`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the status write fails.
    pub async fn set_conditions_ready(
        &self,
        config: &mut DeviceConfig,
        reason: &str,
        message: &str,
    ) -> Result<(), ReconcileError> {
        self.apply(
            config,
            [
                create_condition(CONDITION_TYPE_READY, STATUS_TRUE, reason, Some(message)),
                create_condition(CONDITION_TYPE_ERRORED, STATUS_FALSE, CONDITION_TYPE_READY, None),
            ],
        )
        .await
    }

    /// Set `Ready=False` and `Errored=True` with the given reason and message.
    ///
    /// # Errors
    ///
    /// Returns the store error if the status write fails.
    pub async fn set_conditions_errored(
        &self,
        config: &mut DeviceConfig,
        reason: &str,
        message: &str,
    ) -> Result<(), ReconcileError> {
        self.apply(
            config,
            [
                create_condition(CONDITION_TYPE_READY, STATUS_FALSE, CONDITION_TYPE_ERRORED, None),
                create_condition(CONDITION_TYPE_ERRORED, STATUS_TRUE, reason, Some(message)),
            ],
        )
        .await
    }

    async fn apply(
        &self,
        config: &mut DeviceConfig,
        updates: [Condition; 2],
    ) -> Result<(), ReconcileError> {
        let current = config.conditions().to_vec();
        let mut conditions = current.clone();
        for condition in updates {
            set_condition(&mut conditions, condition);
        }

        if conditions == current {
            debug!(
                namespace = %config.namespace().unwrap_or_default(),
                name = %config.name_any(),
                "Status conditions unchanged, skipping update"
            );
            return Ok(());
        }

        config.status = Some(DeviceConfigStatus { conditions });
        let updated = self.store.update_device_config_status(config).await?;
        config.metadata.resource_version = updated.metadata.resource_version;
        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
