// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! kube-rs `Controller` wiring for `DeviceConfig`.
//!
//! The controller watches `DeviceConfig`s and the `Module`s they own, so a
//! `Module` edited or deleted behind the operator's back triggers a pass for
//! its owner. kube-rs never runs two passes for the same object at once.
//!
//! Successful passes wait for the next change. Failed passes are requeued
//! with a per-object exponential backoff.

use crate::context::Context;
use crate::crd::{DeviceConfig, Module};
use crate::errors::ReconcileError;
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Run the `DeviceConfig` controller until a shutdown signal arrives.
///
/// `watch_namespace` limits both watches to one namespace; `None` watches the whole cluster.
pub async fn run(
    client: Client,
    watch_namespace: Option<String>,
    ctx: Arc<Context>,
) -> anyhow::Result<()> {
    let (device_configs, modules) = match watch_namespace.as_deref() {
        Some(namespace) => {
            info!(namespace, "Starting DeviceConfig controller");
            (
                Api::<DeviceConfig>::namespaced(client.clone(), namespace),
                Api::<Module>::namespaced(client, namespace),
            )
        }
        None => {
            info!("Starting DeviceConfig controller for all namespaces");
            (Api::<DeviceConfig>::all(client.clone()), Api::<Module>::all(client))
        }
    };

    let state = ctx.clone();
    Controller::new(device_configs, Config::default())
        .owns(modules, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            match result {
                Ok((object, _)) => debug!(object = %object, "Reconciliation finished"),
                // A requeued object deleted from the cache never reaches the reconciler again.
                Err(controller::Error::ObjectNotFound(object)) => {
                    debug!(object = %object, "DeviceConfig left the cache");
                    forget_device_config(&state, &object.name, object.namespace.as_deref());
                }
                Err(e) => warn!(error = %e, "Controller reported an error"),
            }
            futures::future::ready(())
        })
        .await;

    info!("DeviceConfig controller stopped");
    Ok(())
}

/// Reconcile wrapper for `DeviceConfig`.
///
/// # Errors
///
/// Returns the reconciliation error so the controller applies [`error_policy`].
pub async fn reconcile(
    config: Arc<DeviceConfig>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let key = ObjectRef::from_obj(config.as_ref());
    debug!(
        namespace = ?config.namespace(),
        name = %config.name_any(),
        "Reconcile wrapper called for DeviceConfig"
    );

    let start = Instant::now();
    let result = ctx.reconciler.reconcile(&key).await;
    let label = result.as_ref().map_or("error", |outcome| outcome.as_str());
    ctx.metrics.record_reconciliation(label, start.elapsed());

    match result {
        Ok(outcome) => {
            ctx.backoff.reset(&key);
            info!(
                namespace = ?config.namespace(),
                name = %config.name_any(),
                outcome = ?outcome,
                "Successfully reconciled DeviceConfig"
            );
            Ok(Action::await_change())
        }
        Err(e) => {
            error!(
                namespace = ?config.namespace(),
                name = %config.name_any(),
                error = %e,
                "Failed to reconcile DeviceConfig"
            );
            Err(e)
        }
    }
}

/// Error policy for the `DeviceConfig` controller.
///
/// A `DeviceConfig` that vanished mid-pass is forgotten instead of requeued;
/// its reappearance is a watch event of its own.
#[must_use]
pub fn error_policy(config: Arc<DeviceConfig>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    if err.is_device_config_gone() {
        debug!(
            namespace = ?config.namespace(),
            name = %config.name_any(),
            "DeviceConfig disappeared during reconciliation"
        );
        forget_device_config(&ctx, &config.name_any(), config.namespace().as_deref());
        return Action::await_change();
    }

    let delay = ctx.backoff.next_delay(&ObjectRef::from_obj(config.as_ref()));
    warn!(
        namespace = ?config.namespace(),
        name = %config.name_any(),
        conflict = err.is_conflict(),
        delay_secs = delay.as_secs_f64(),
        "Requeueing DeviceConfig after failure"
    );
    Action::requeue(delay)
}

/// Drop the requeue and metric state kept for a `DeviceConfig` that no longer exists.
pub fn forget_device_config(ctx: &Context, name: &str, namespace: Option<&str>) {
    let key = match namespace {
        Some(namespace) => ObjectRef::new(name).within(namespace),
        None => ObjectRef::new(name),
    };
    ctx.backoff.reset(&key);
    ctx.metrics.remove_device_config(name);
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
