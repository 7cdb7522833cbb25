// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP endpoints for metrics scraping and kubelet probes.
//!
//! - `GET /metrics` on the metrics address renders the operator registry
//! - `GET /healthz` and `GET /readyz` on the probe address answer `ok`

use crate::constants::{HEALTHZ_PATH, METRICS_SERVER_PATH, READYZ_PATH};
use crate::metrics::Metrics;
use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Router serving the Prometheus text exposition of `metrics`.
pub fn metrics_router(metrics: Metrics) -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(render_metrics))
        .with_state(metrics)
}

/// Router serving the liveness and readiness probes.
pub fn probe_router() -> Router {
    Router::new()
        .route(HEALTHZ_PATH, get(probe))
        .route(READYZ_PATH, get(probe))
}

async fn render_metrics(State(metrics): State<Metrics>) -> impl IntoResponse {
    match metrics.gather() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn probe() -> &'static str {
    "ok"
}

/// Serve `router` on `addr` until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(name: &str, addr: SocketAddr, router: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {name} server to {addr}"))?;
    info!(server = name, address = %addr, "HTTP server listening");

    axum::serve(listener, router)
        .await
        .with_context(|| format!("{name} server failed"))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
