// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! JSON merge patch (RFC 7386) helpers.
//!
//! [`merge_patch_diff`] computes the smallest merge patch turning one document
//! into another, which lets the `Module` reconciler send only the fields that
//! changed and skip the write entirely when nothing did. [`apply_merge_patch`]
//! is the inverse and is used by the in-memory store to emulate the API server.
//!
//! Arrays are atomic in a merge patch: a changed array is replaced as a whole.

use serde_json::{Map, Value};

/// Compute the merge patch that turns `original` into `desired`.
///
/// Keys present in `original` but absent from `desired` are emitted as `null`
/// (delete). Returns an empty object when the documents are equal.
#[must_use]
pub fn merge_patch_diff(original: &Value, desired: &Value) -> Value {
    match (original, desired) {
        (Value::Object(original), Value::Object(desired)) => {
            let mut patch = Map::new();

            for (key, desired_value) in desired {
                match original.get(key) {
                    Some(original_value) if original_value == desired_value => {}
                    Some(original_value @ Value::Object(_)) if desired_value.is_object() => {
                        let nested = merge_patch_diff(original_value, desired_value);
                        if !is_empty_patch(&nested) {
                            patch.insert(key.clone(), nested);
                        }
                    }
                    _ => {
                        patch.insert(key.clone(), desired_value.clone());
                    }
                }
            }

            for key in original.keys() {
                if !desired.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }

            Value::Object(patch)
        }
        _ => desired.clone(),
    }
}

/// Apply a merge patch to `target` in place.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(fields) = target {
        for (key, value) in patch {
            if value.is_null() {
                fields.remove(key);
            } else {
                apply_merge_patch(fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// True when the patch would not change anything.
#[must_use]
pub fn is_empty_patch(patch: &Value) -> bool {
    patch.as_object().is_some_and(Map::is_empty)
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod patch_tests;
