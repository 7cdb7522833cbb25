// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `DeviceConfig` controller.
//!
//! The controller hands every reconciliation an `Arc<Context>` holding:
//! - the reconciler with its store and event publisher
//! - the metrics handle
//! - the per-object requeue backoff

use crate::events::EventPublisher;
use crate::metrics::Metrics;
use crate::reconcilers::{DeviceConfigReconciler, RequeueBackoff};
use crate::store::ClusterStore;
use std::sync::Arc;

/// Shared context passed to the controller callbacks.
pub struct Context {
    /// Runs reconciliation passes
    pub reconciler: DeviceConfigReconciler,

    /// Metrics registry for observability
    pub metrics: Metrics,

    /// Requeue delays for failed reconciliations
    pub backoff: RequeueBackoff,
}

impl Context {
    /// Build a context whose reconciler reports to `metrics`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ClusterStore>,
        events: Arc<dyn EventPublisher>,
        metrics: Metrics,
    ) -> Self {
        Self {
            reconciler: DeviceConfigReconciler::new(store, events, metrics.clone()),
            metrics,
            backoff: RequeueBackoff::default(),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
