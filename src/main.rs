// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use device_config_operator::{
    config::{watch_namespace_from_env, OperatorConfig},
    constants::TOKIO_WORKER_THREADS,
    context::Context,
    controller,
    events::KubeEventPublisher,
    leader,
    metrics::Metrics,
    server,
    store::KubeStore,
};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("device-config-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT=json|text`.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    let config = OperatorConfig::parse();
    init_logging();

    info!("Starting device configuration operator");
    debug!(?config, "Loaded configuration");

    let watch_namespace = watch_namespace_from_env();

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let metrics = Metrics::new()?;
    let store = Arc::new(KubeStore::new(client.clone(), watch_namespace.clone()));
    let events = Arc::new(KubeEventPublisher::new(
        client.clone(),
        &config.event_reporter,
    ));
    let ctx = Arc::new(Context::new(store, events, metrics.clone()));

    let run_controller = controller::run(client.clone(), watch_namespace, ctx);
    let run_operator = async {
        if config.leader_elect {
            leader::run_as_leader(client.clone(), &config, &metrics, run_controller).await
        } else {
            run_controller.await
        }
    };

    // The controller returns on SIGINT/SIGTERM; the servers should never exit
    tokio::select! {
        result = run_operator => {
            match &result {
                Ok(()) => info!("Controller stopped, shutting down"),
                Err(e) => error!("Controller exited with error: {:?}", e),
            }
            result
        }
        result = server::serve("metrics", config.metrics_bind_address, server::metrics_router(metrics.clone())) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = server::serve("health probe", config.health_probe_bind_address, server::probe_router()) => {
            error!("CRITICAL: health probe server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("health probe server exited unexpectedly without error")
        }
    }
}
