// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Equality-based label selector utilities for `DeviceConfig` node selectors.
//!
//! A `DeviceConfig` node selector is a plain `key -> value` map; a node is
//! selected when it carries every key with exactly the given value. The same
//! map is rendered into the `labelSelector` query parameter when nodes are
//! listed from the API server and evaluated locally by the in-memory store.
//!
//! # Example
//!
//! ```rust
//! use device_config_operator::selector::{matches_labels, to_label_selector};
//! use std::collections::BTreeMap;
//!
//! let selector = BTreeMap::from([("gpu".to_string(), "true".to_string())]);
//! assert_eq!(to_label_selector(&selector), "gpu=true");
//!
//! let node_labels = BTreeMap::from([
//!     ("gpu".to_string(), "true".to_string()),
//!     ("zone".to_string(), "a".to_string()),
//! ]);
//! assert!(matches_labels(&selector, &node_labels));
//! ```

use std::collections::BTreeMap;

/// Render a selector map as a Kubernetes `labelSelector` string (`k1=v1,k2=v2`).
///
/// Keys are emitted in sorted order, so the same map always produces the same
/// query. An empty map renders as an empty string, which selects everything.
#[must_use]
pub fn to_label_selector(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Check whether a label set satisfies an equality-based selector.
#[must_use]
pub fn matches_labels(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
