// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for cluster store access and reconciliation.
//!
//! [`StoreError`] classifies failures of the cluster API into the cases the
//! reconcilers branch on (not found, optimistic concurrency conflict, anything
//! else). [`ReconcileError`] is what a reconciliation returns; its `Display`
//! output is the message surfaced in status conditions and logs, so the
//! wrapping variants compose messages as `<context>: <cause>`.

use crate::constants::KIND_DEVICE_CONFIG;
use thiserror::Error;

/// Errors returned by a [`ClusterStore`](crate::store::ClusterStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested object does not exist (HTTP 404).
    #[error("{kind} \"{name}\" not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Namespace of the missing object, empty for cluster-scoped kinds
        namespace: String,
        /// Name of the missing object
        name: String,
    },

    /// The write lost an optimistic concurrency race or the object already exists (HTTP 409).
    #[error("Operation cannot be fulfilled on {kind} \"{name}\": {message}")]
    Conflict {
        /// Kind of the object being written
        kind: String,
        /// Namespace of the object being written
        namespace: String,
        /// Name of the object being written
        name: String,
        /// Server supplied detail
        message: String,
    },

    /// The store could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An object could not be converted to or from its JSON representation.
    #[error("failed to convert object: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other Kubernetes API error.
    #[error(transparent)]
    Kube(kube::Error),
}

impl StoreError {
    /// Classify a Kubernetes API error for an object of the given kind.
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 404 => Self::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ref response) if response.code == 409 => Self::Conflict {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: response.message.clone(),
            },
            other => Self::Kube(other),
        }
    }

    /// True when the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the write lost an optimistic concurrency race.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True when the missing object is of the given kind.
    #[must_use]
    pub fn is_not_found_kind(&self, expected: &str) -> bool {
        matches!(self, Self::NotFound { kind, .. } if kind == expected)
    }
}

/// Errors returned by the reconcilers.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A store call failed and the caller adds no context of its own.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Another `DeviceConfig` selects at least one of the same nodes.
    #[error("conflicting DeviceConfig NodeSelectors found for resource: {name}")]
    ConflictingNodeSelector {
        /// Name of the `DeviceConfig` being validated
        name: String,
    },

    /// A caller violated an argument contract.
    #[error("{0}")]
    InvalidArgument(String),

    /// The `Module` is controlled by a different owner.
    #[error("Module {module} is already controlled by {owner}")]
    AlreadyOwned {
        /// Name of the `Module`
        module: String,
        /// `kind/name` of the existing controller
        owner: String,
    },

    /// Adding or removing the deletion finalizer failed.
    #[error("failed to {action} deletion finalizer for {name}: {source}")]
    Finalizer {
        /// `add` or `remove`
        action: &'static str,
        /// Name of the `DeviceConfig`
        name: String,
        /// Underlying store failure
        source: StoreError,
    },

    /// Deleting the `Module` failed for a reason other than it being absent.
    #[error("failed to delete Module {name}: {source}")]
    ModuleDelete {
        /// Name of the `Module`
        name: String,
        /// Underlying store failure
        source: StoreError,
    },

    /// Creating or patching the `Module` failed.
    #[error("could not create or patch Module: {0}")]
    ModuleUpsert(#[source] Box<ReconcileError>),

    /// Cleaning up after a deleted `DeviceConfig` failed.
    #[error("failed to delete DeviceConfig resources: {0}")]
    Cleanup(#[source] Box<ReconcileError>),

    /// Recording a failure in the status failed as well.
    #[error("{cause}: {status}")]
    StatusUpdate {
        /// The failure that was being recorded
        cause: Box<ReconcileError>,
        /// Why the status write failed
        status: Box<ReconcileError>,
    },

    /// An object could not be converted to or from JSON.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// True when the failure is an optimistic concurrency conflict somewhere in the chain.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Store(err)
            | Self::Finalizer { source: err, .. }
            | Self::ModuleDelete { source: err, .. } => err.is_conflict(),
            Self::ModuleUpsert(inner) | Self::Cleanup(inner) => inner.is_conflict(),
            Self::StatusUpdate { cause, status } => cause.is_conflict() || status.is_conflict(),
            _ => false,
        }
    }

    /// True when the `DeviceConfig` itself disappeared during the pass.
    #[must_use]
    pub fn is_device_config_gone(&self) -> bool {
        match self {
            Self::Store(err) | Self::Finalizer { source: err, .. } => {
                err.is_not_found_kind(KIND_DEVICE_CONFIG)
            }
            Self::Cleanup(inner) => inner.is_device_config_gone(),
            Self::StatusUpdate { status, .. } => status.is_device_config_gone(),
            _ => false,
        }
    }
}
