// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes events attached to `DeviceConfig` resources.
//!
//! Events are a best-effort notification channel: a failure to publish one is
//! logged and never fails the reconciliation that emitted it.
//!
//! `RecordingEventPublisher` is only built for tests and with the `test-util` feature.

use crate::crd::DeviceConfig;
use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder};
use kube::{Client, Resource, ResourceExt};
#[cfg(any(test, feature = "test-util"))]
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Severity of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

/// Sink for events attached to a `DeviceConfig`.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        config: &DeviceConfig,
        severity: EventSeverity,
        reason: &str,
        note: &str,
    );
}

/// Publishes events through the `events.k8s.io` API.
#[derive(Clone)]
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller`.
    #[must_use]
    pub fn new(client: Client, controller: &str) -> Self {
        Self {
            recorder: Recorder::new(client, controller.to_string().into()),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        config: &DeviceConfig,
        severity: EventSeverity,
        reason: &str,
        note: &str,
    ) {
        let type_ = match severity {
            EventSeverity::Normal => EventType::Normal,
            EventSeverity::Warning => EventType::Warning,
        };
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(note.to_string()),
            action: "Reconcile".to_string(),
            secondary: None,
        };

        if let Err(e) = self.recorder.publish(&event, &config.object_ref(&())).await {
            warn!(
                namespace = %config.namespace().unwrap_or_default(),
                name = %config.name_any(),
                reason,
                error = %e,
                "Failed to publish event"
            );
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
/// An event captured by [`RecordingEventPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub namespace: String,
    pub name: String,
    pub severity: EventSeverity,
    pub reason: String,
    pub note: String,
}

#[cfg(any(test, feature = "test-util"))]
/// Keeps published events in memory, for tests.
#[derive(Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        config: &DeviceConfig,
        severity: EventSeverity,
        reason: &str,
        note: &str,
    ) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                namespace: config.namespace().unwrap_or_default(),
                name: config.name_any(),
                severity,
                reason: reason.to_string(),
                note: note.to_string(),
            });
    }
}
