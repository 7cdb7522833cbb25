// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition types and reasons for `DeviceConfig` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition
//! has a particular status, following Kubernetes conventions.
//!
//! # Condition Types
//!
//! A `DeviceConfig` carries exactly two conditions, always written together:
//!
//! - `Ready` - the `Module` matches the desired state
//! - `Errored` - the last reconciliation failed
//!
//! Exactly one of them is `True` after the first reconciliation.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: Errored
//!       lastTransitionTime: "2025-01-01T00:00:00Z"
//!     - type: Errored
//!       status: "True"
//!       reason: ModuleFailed
//!       message: "could not create or patch Module: ..."
//!       lastTransitionTime: "2025-01-01T00:00:00Z"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Condition type reporting a converged `DeviceConfig`.
///
/// Also used as the reason of the `Errored=False` condition on success.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition type reporting a failed reconciliation.
///
/// Also used as the reason of the `Ready=False` condition on failure.
pub const CONDITION_TYPE_ERRORED: &str = "Errored";

// ============================================================================
// Condition Status Values
// ============================================================================

/// Condition status `True`
pub const STATUS_TRUE: &str = "True";

/// Condition status `False`
pub const STATUS_FALSE: &str = "False";

// ============================================================================
// Reasons
// ============================================================================

/// All resources were reconciled.
pub const REASON_RECONCILED: &str = "Reconciled";

/// Creating or patching the `Module` failed.
///
/// The `Errored` condition message carries the error text.
pub const REASON_MODULE_FAILED: &str = "ModuleFailed";

/// The node selector overlaps with another `DeviceConfig`.
///
/// The `Module` is left untouched until the overlap is resolved.
pub const REASON_CONFLICTING_NODE_SELECTOR: &str = "ConflictingNodeSelector";

// ============================================================================
// Messages
// ============================================================================

/// Message of the `Ready=True` condition.
pub const MESSAGE_RECONCILED: &str = "All resources have been successfully reconciled";
