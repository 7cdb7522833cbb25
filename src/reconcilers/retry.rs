// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-object requeue backoff for failed reconciliations.
//!
//! Each failure of the same `DeviceConfig` doubles its requeue delay, starting
//! at 5 seconds and capped at 5 minutes. A successful pass resets the object's
//! attempt count. Delays carry ±10% jitter so objects that failed together do
//! not retry together.
//!
//! # Retry Schedule
//!
//! 1. 5s
//! 2. 10s
//! 3. 20s
//! 4. 40s
//! 5. 80s
//! 6. 160s
//! 7. 300s (capped), and every attempt after that

use crate::constants::{
    ERROR_REQUEUE_INITIAL_SECS, ERROR_REQUEUE_MAX_SECS, ERROR_REQUEUE_MULTIPLIER,
    ERROR_REQUEUE_RANDOMIZATION_FACTOR,
};
use crate::crd::DeviceConfig;
use kube::runtime::reflector::ObjectRef;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Exponential requeue delays tracked per `DeviceConfig`.
pub struct RequeueBackoff {
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    attempts: Mutex<HashMap<ObjectRef<DeviceConfig>, u32>>,
}

impl Default for RequeueBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(ERROR_REQUEUE_INITIAL_SECS),
            Duration::from_secs(ERROR_REQUEUE_MAX_SECS),
            ERROR_REQUEUE_MULTIPLIER,
            ERROR_REQUEUE_RANDOMIZATION_FACTOR,
        )
    }
}

impl RequeueBackoff {
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            initial_interval,
            max_interval,
            multiplier,
            randomization_factor,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before the next retry of `key`, counting this call as a failed attempt.
    pub fn next_delay(&self, key: &ObjectRef<DeviceConfig>) -> Duration {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
            let attempt = attempts.entry(key.clone()).or_insert(0);
            let current = *attempt;
            *attempt = attempt.saturating_add(1);
            current
        };
        self.apply_jitter(self.interval(attempt))
    }

    /// Forget the failures of `key`.
    pub fn reset(&self, key: &ObjectRef<DeviceConfig>) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of objects with failures on record.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Un-jittered delay of the given zero-based attempt.
    fn interval(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        if secs.is_finite() && secs < self.max_interval.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_interval
        }
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::random_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
