// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kernel module management `Module` reconciliation.
//!
//! Each `DeviceConfig` owns exactly one `Module` named `<name>-module` in its
//! namespace. The `Module` tells the kernel module controller which driver
//! image to load on which nodes:
//!
//! ```yaml
//! apiVersion: kmm.sigs.k8s.io/v1beta1
//! kind: Module
//! metadata:
//!   name: gpu-driver-module
//!   ownerReferences:
//!     - kind: DeviceConfig
//!       name: gpu-driver
//!       controller: true
//!       blockOwnerDeletion: true
//! spec:
//!   moduleLoader:
//!     container:
//!       imagePullPolicy: Always
//!       kernelMappings:
//!         - containerImage: quay.io/example/driver:1.2.3-${KERNEL_FULL_VERSION}
//!           regexp: '^.*\.el\d_?\d?\..*$'
//!     serviceAccountName: driver-sample
//!   selector:
//!     feature.node.kubernetes.io/pci-1da3.present: "true"
//! ```
//!
//! The `${KERNEL_FULL_VERSION}` token is resolved per node by the kernel
//! module controller.
//!
//! Updates are sent as a JSON merge patch holding only the fields that differ,
//! and no request is made when the `Module` already matches.

use crate::constants::{
    DRIVER_IMAGE_PULL_POLICY, DRIVER_SERVICE_ACCOUNT, KERNEL_FULL_VERSION_TOKEN,
    KERNEL_VERSION_REGEXP, MODULE_NAME_SUFFIX,
};
use crate::crd::{
    DeviceConfig, KernelMapping, Module, ModuleLoaderContainerSpec, ModuleLoaderSpec, ModuleSpec,
};
use crate::errors::ReconcileError;
use crate::patch::{is_empty_patch, merge_patch_diff};
use crate::store::ClusterStore;
use kube::{Resource, ResourceExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What `reconcile_module` did to the `Module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Patched,
    Unchanged,
}

impl OperationResult {
    /// Lowercase name, used in logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Patched => "patched",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the `Module` owned by a `DeviceConfig`.
#[must_use]
pub fn module_name(config: &DeviceConfig) -> String {
    format!("{}-{MODULE_NAME_SUFFIX}", config.name_any())
}

/// Driver image reference for a `DeviceConfig`, with the kernel release left as a token.
#[must_use]
pub fn driver_image(config: &DeviceConfig) -> String {
    format!(
        "{}:{}-{KERNEL_FULL_VERSION_TOKEN}",
        config.spec.driver_image, config.spec.driver_version
    )
}

fn desired_module_spec(config: &DeviceConfig) -> ModuleSpec {
    ModuleSpec {
        module_loader: ModuleLoaderSpec {
            container: ModuleLoaderContainerSpec {
                image_pull_policy: Some(DRIVER_IMAGE_PULL_POLICY.to_string()),
                kernel_mappings: vec![KernelMapping {
                    container_image: Some(driver_image(config)),
                    regexp: Some(KERNEL_VERSION_REGEXP.to_string()),
                    literal: None,
                }],
            },
            service_account_name: Some(DRIVER_SERVICE_ACCOUNT.to_string()),
        },
        selector: config.effective_node_selector(),
    }
}

/// Write the desired spec and controller reference of `config` into `module`.
///
/// Owner references of other owners are preserved.
///
/// # Errors
///
/// - `InvalidArgument` when `module` is `None`
/// - `InvalidArgument` when `config` has no name or uid to reference
/// - `AlreadyOwned` when another object is already the controller of `module`
pub fn set_desired_module(
    module: Option<&mut Module>,
    config: &DeviceConfig,
) -> Result<(), ReconcileError> {
    let module = module
        .ok_or_else(|| ReconcileError::InvalidArgument("module cannot be nil".to_string()))?;

    let owner = config.controller_owner_ref(&()).ok_or_else(|| {
        ReconcileError::InvalidArgument(format!(
            "DeviceConfig {} has no uid to reference",
            config.name_any()
        ))
    })?;

    let owner_references = module.owner_references_mut();
    if let Some(existing) = owner_references
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(ReconcileError::AlreadyOwned {
            module: module_name(config),
            owner: format!("{}/{}", existing.kind, existing.name),
        });
    }
    owner_references.retain(|r| r.uid != owner.uid);
    owner_references.push(owner);

    module.spec = desired_module_spec(config);
    Ok(())
}

/// Creates, patches and deletes the `Module` of a `DeviceConfig`.
#[derive(Clone)]
pub struct ModuleReconciler {
    store: Arc<dyn ClusterStore>,
}

impl ModuleReconciler {
    #[must_use]
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Bring the `Module` of `config` to its desired state.
    ///
    /// A missing `Module` is created. An existing one is patched with the
    /// merge patch between its current and desired state, or left alone when
    /// that patch is empty.
    ///
    /// # Errors
    ///
    /// - the store error when fetching the `Module` fails for a reason other than not found
    /// - `could not create or patch Module: <cause>` when computing or writing the `Module` fails
    pub async fn reconcile_module(
        &self,
        config: &DeviceConfig,
    ) -> Result<OperationResult, ReconcileError> {
        let namespace = config.namespace().unwrap_or_default();
        let name = module_name(config);

        let existing = match self.store.get_module(&namespace, &name).await {
            Ok(module) => Some(module),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        let result = self
            .upsert(existing, config, &namespace, &name)
            .await
            .map_err(|e| ReconcileError::ModuleUpsert(Box::new(e)))?;

        info!(
            namespace = %namespace,
            name = %name,
            result = %result,
            "Reconciled Module"
        );
        Ok(result)
    }

    async fn upsert(
        &self,
        existing: Option<Module>,
        config: &DeviceConfig,
        namespace: &str,
        name: &str,
    ) -> Result<OperationResult, ReconcileError> {
        let Some(current) = existing else {
            let mut module = Module::new(name, ModuleSpec::default());
            module.metadata.namespace = Some(namespace.to_string());
            set_desired_module(Some(&mut module), config)?;

            debug!(namespace = %namespace, name = %name, "Creating Module");
            self.store.create_module(&module).await?;
            return Ok(OperationResult::Created);
        };

        let mut desired = current.clone();
        set_desired_module(Some(&mut desired), config)?;

        let patch = merge_patch_diff(
            &serde_json::to_value(&current)?,
            &serde_json::to_value(&desired)?,
        );
        if is_empty_patch(&patch) {
            return Ok(OperationResult::Unchanged);
        }

        debug!(namespace = %namespace, name = %name, patch = %patch, "Patching Module");
        self.store.patch_module(namespace, name, &patch).await?;
        Ok(OperationResult::Patched)
    }

    /// Delete the `Module` of `config`. A missing `Module` counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns `failed to delete Module <name>: <cause>` for any other failure.
    pub async fn delete_module(&self, config: &DeviceConfig) -> Result<(), ReconcileError> {
        let namespace = config.namespace().unwrap_or_default();
        let name = module_name(config);

        match self.store.delete_module(&namespace, &name).await {
            Ok(()) => {
                info!(namespace = %namespace, name = %name, "Deleted Module");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(namespace = %namespace, name = %name, "Module already absent");
                Ok(())
            }
            Err(source) => Err(ReconcileError::ModuleDelete { name, source }),
        }
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod module_tests;
