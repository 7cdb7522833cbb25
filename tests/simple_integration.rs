// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests against a live Kubernetes cluster.
//!
//! These tests expect the `DeviceConfig` CRD to be installed and the operator
//! to be running. They skip themselves when no cluster is reachable.
//!
//! Run with: cargo test --test simple_integration -- --ignored

mod common;

use common::{
    cleanup_test_namespace, create_test_namespace, device_config, get_kube_client_or_skip,
};
use device_config_operator::constants::DEVICE_CONFIG_DELETION_FINALIZER;
use device_config_operator::crd::{DeviceConfig, Module};
use device_config_operator::store::pagination::list_all_paginated;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::ResourceExt;
use std::time::Duration;
use tokio::time::sleep;

const TEST_NAMESPACE: &str = "device-config-operator-it";

/// Poll `check` once per second until it returns true or `timeout` elapses.
async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        sleep(Duration::from_secs(1)).await;
    }
    false
}

#[tokio::test]
#[ignore] // Run with: cargo test --test simple_integration -- --ignored
async fn test_kubernetes_connectivity() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };

    let namespaces: Api<Namespace> = Api::all(client);
    let items = list_all_paginated(&namespaces, ListParams::default())
        .await
        .expect("Failed to list namespaces");

    assert!(!items.is_empty(), "Expected at least one namespace");
}

#[tokio::test]
#[ignore]
async fn test_crd_installed() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };

    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let crd = crds
        .get("deviceconfigs.example.com")
        .await
        .expect("DeviceConfig CRD is not installed");

    assert_eq!(crd.spec.names.kind, "DeviceConfig");
}

#[tokio::test]
#[ignore]
async fn test_device_config_create_and_delete() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    create_test_namespace(&client, TEST_NAMESPACE)
        .await
        .expect("Failed to create test namespace");

    let device_configs: Api<DeviceConfig> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let modules: Api<Module> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    device_configs
        .create(
            &PostParams::default(),
            &device_config(TEST_NAMESPACE, "it-driver", None),
        )
        .await
        .expect("Failed to create DeviceConfig");

    let created = eventually(Duration::from_secs(60), || async {
        modules.get_opt("it-driver-module").await.ok().flatten().is_some()
    })
    .await;
    assert!(created, "Module was not created");

    let config = device_configs.get("it-driver").await.unwrap();
    assert!(config
        .finalizers()
        .iter()
        .any(|f| f == DEVICE_CONFIG_DELETION_FINALIZER));

    device_configs
        .delete("it-driver", &DeleteParams::default())
        .await
        .expect("Failed to delete DeviceConfig");

    let removed = eventually(Duration::from_secs(60), || async {
        matches!(device_configs.get_opt("it-driver").await, Ok(None))
            && matches!(modules.get_opt("it-driver-module").await, Ok(None))
    })
    .await;
    assert!(removed, "DeviceConfig or Module was not removed");

    cleanup_test_namespace(&client, TEST_NAMESPACE).await;
}
