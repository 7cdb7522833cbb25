// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration of the operator process.
//!
//! Every flag can also be set through an environment variable, which is how
//! the operator is usually configured inside its Deployment.

use crate::constants::{
    DEFAULT_EVENT_REPORTER, DEFAULT_HEALTH_PROBE_BIND_ADDRESS, DEFAULT_LEADER_ELECTION_ID,
    DEFAULT_METRICS_BIND_ADDRESS, WATCH_NAMESPACE_ENV,
};
use clap::Parser;
use std::net::SocketAddr;
use tracing::error;

/// Device configuration operator: manages driver `Module`s for `DeviceConfig` resources.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct OperatorConfig {
    /// Address the Prometheus metrics endpoint binds to
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,

    /// Address the health and readiness probes bind to
    #[arg(
        long,
        env = "HEALTH_PROBE_BIND_ADDRESS",
        default_value = DEFAULT_HEALTH_PROBE_BIND_ADDRESS
    )]
    pub health_probe_bind_address: SocketAddr,

    /// Only run the controller while holding the leader lease
    #[arg(long, env = "LEADER_ELECT")]
    pub leader_elect: bool,

    /// Namespace of the leader election lease
    #[arg(long, env = "POD_NAMESPACE", default_value = "default")]
    pub leader_election_namespace: String,

    /// Name of the leader election lease
    #[arg(long, env = "LEADER_ELECTION_ID", default_value = DEFAULT_LEADER_ELECTION_ID)]
    pub leader_election_id: String,

    /// Reporting controller name attached to emitted events
    #[arg(long, env = "EVENT_REPORTER", default_value = DEFAULT_EVENT_REPORTER)]
    pub event_reporter: String,
}

/// Turn the raw `WATCH_NAMESPACE` value into the namespace to watch.
///
/// An empty value means cluster scope. An unset value is a deployment mistake:
/// it is logged and the operator falls back to watching all namespaces.
#[must_use]
pub fn resolve_watch_namespace(value: Option<&str>) -> Option<String> {
    match value {
        None => {
            error!(
                env = WATCH_NAMESPACE_ENV,
                "Unable to get watch namespace, watching all namespaces"
            );
            None
        }
        Some("") => None,
        Some(namespace) => Some(namespace.to_string()),
    }
}

/// Namespace to watch, read from the `WATCH_NAMESPACE` environment variable.
#[must_use]
pub fn watch_namespace_from_env() -> Option<String> {
    let value = std::env::var(WATCH_NAMESPACE_ENV).ok();
    resolve_watch_namespace(value.as_deref())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
