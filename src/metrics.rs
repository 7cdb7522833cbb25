// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the device configuration operator.
//!
//! All metrics live in a [`Metrics`] handle that owns its own [`Registry`].
//! The handle is created once in `main`, shared through the reconciliation
//! context and rendered by the `/metrics` endpoint, so tests can build an
//! isolated instance instead of sharing process-wide state.
//!
//! # Metrics
//!
//! - `device_config_operator_reconciliation_failed{device_config}` - 1 while the
//!   last reconciliation of a `DeviceConfig` failed or found a node selector conflict
//! - `device_config_operator_reconciliations_total{outcome}`
//! - `device_config_operator_reconciliation_duration_seconds`
//! - `device_config_operator_module_operations_total{operation}`
//! - `device_config_operator_leader` - 1 while this replica holds the leader lease
//!
//! # Example
//!
//! ```rust
//! use device_config_operator::metrics::Metrics;
//!
//! let metrics = Metrics::new().unwrap();
//! metrics.set_reconciliation_failed("gpu-driver", true);
//! assert!(metrics.gather().unwrap().contains("gpu-driver"));
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "device_config_operator";

/// Operator metrics and the registry they are exposed from.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliation_failed: GaugeVec,
    reconciliations_total: CounterVec,
    reconciliation_duration: Histogram,
    module_operations_total: CounterVec,
    leader: Gauge,
}

impl Metrics {
    /// Create and register all metrics in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric definition is invalid or registered twice.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliation_failed = GaugeVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_reconciliation_failed"),
                "Whether the last reconciliation of a DeviceConfig failed (1) or succeeded (0)",
            ),
            &["device_config"],
        )?;
        registry.register(Box::new(reconciliation_failed.clone()))?;

        let reconciliations_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_reconciliations_total"),
                "Total number of DeviceConfig reconciliations by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(reconciliations_total.clone()))?;

        let reconciliation_duration = Histogram::with_opts(
            HistogramOpts::new(
                format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
                "Duration of DeviceConfig reconciliations in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(reconciliation_duration.clone()))?;

        let module_operations_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_module_operations_total"),
                "Total number of Module writes by operation",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(module_operations_total.clone()))?;

        let leader = Gauge::with_opts(Opts::new(
            format!("{METRICS_NAMESPACE}_leader"),
            "Whether this replica currently holds the leader lease (1) or not (0)",
        ))?;
        registry.register(Box::new(leader.clone()))?;

        Ok(Self {
            registry,
            reconciliation_failed,
            reconciliations_total,
            reconciliation_duration,
            module_operations_total,
            leader,
        })
    }

    /// Flip the failure gauge of a `DeviceConfig`.
    pub fn set_reconciliation_failed(&self, device_config: &str, failed: bool) {
        self.reconciliation_failed
            .with_label_values(&[device_config])
            .set(if failed { 1.0 } else { 0.0 });
    }

    /// Drop the failure gauge series of a `DeviceConfig` that no longer exists.
    pub fn remove_device_config(&self, device_config: &str) {
        // Absent series are fine: the object may never have been reconciled here.
        let _ = self
            .reconciliation_failed
            .remove_label_values(&[device_config]);
    }

    /// Current value of the failure gauge of a `DeviceConfig`.
    #[must_use]
    pub fn reconciliation_failed(&self, device_config: &str) -> f64 {
        self.reconciliation_failed
            .with_label_values(&[device_config])
            .get()
    }

    /// Count one finished reconciliation and observe its duration.
    pub fn record_reconciliation(&self, outcome: &str, duration: Duration) {
        self.reconciliations_total
            .with_label_values(&[outcome])
            .inc();
        self.reconciliation_duration
            .observe(duration.as_secs_f64());
    }

    /// Count one `Module` write (`created`, `patched`, `unchanged` or `deleted`).
    pub fn record_module_operation(&self, operation: &str) {
        self.module_operations_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Record whether this replica is the leader.
    pub fn set_leader(&self, leader: bool) {
        self.leader.set(if leader { 1.0 } else { 0.0 });
    }

    /// Render all metrics in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
