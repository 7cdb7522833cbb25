// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `server.rs`

#[cfg(test)]
mod tests {
    use crate::metrics::Metrics;
    use crate::server::{probe, render_metrics};
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_metrics_endpoint_renders_registry() {
        let metrics = Metrics::new().unwrap();
        metrics.set_reconciliation_failed("gpu-driver", true);

        let response = render_metrics(State(metrics)).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("device_config_operator_reconciliation_failed"));
        assert!(text.contains("device_config=\"gpu-driver\""));
    }

    #[tokio::test]
    async fn test_probe_answers_ok() {
        assert_eq!(probe().await, "ok");
    }
}
