// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Leader election through a `coordination.k8s.io` Lease.
//!
//! Only the replica holding the lease runs the controller. A replica that
//! loses the lease stops, and the Deployment restarts it as a follower.

use crate::config::OperatorConfig;
use crate::constants::{DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_GRACE_SECS};
use crate::metrics::Metrics;
use anyhow::{bail, Result};
use kube::Client;
use kube_lease_manager::LeaseManagerBuilder;
use std::future::Future;
use tokio::sync::watch;
use tracing::{info, warn};

/// Identity this replica uses as lease holder.
#[must_use]
pub fn holder_identity() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("device-config-operator-{:08x}", rand::random::<u32>()))
}

/// Wait until `channel` reports leadership. Fails if the lease task stops first.
async fn wait_for_leadership(channel: &mut watch::Receiver<bool>) -> Result<()> {
    while !*channel.borrow_and_update() {
        if channel.changed().await.is_err() {
            bail!("leader election task stopped before acquiring the lease");
        }
    }
    Ok(())
}

/// Resolve once `channel` reports that leadership was lost.
async fn wait_for_loss(channel: &mut watch::Receiver<bool>) {
    while *channel.borrow_and_update() {
        if channel.changed().await.is_err() {
            return;
        }
    }
}

/// Run `work` only while this replica holds the leader lease.
///
/// # Errors
///
/// Returns an error if the lease cannot be set up, if leadership is lost,
/// or if `work` fails.
pub async fn run_as_leader<F>(
    client: Client,
    config: &OperatorConfig,
    metrics: &Metrics,
    work: F,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let identity = holder_identity();
    info!(
        lease = %config.leader_election_id,
        namespace = %config.leader_election_namespace,
        identity = %identity,
        "Starting leader election"
    );

    let manager = LeaseManagerBuilder::new(client, &config.leader_election_id)
        .with_namespace(&config.leader_election_namespace)
        .with_identity(&identity)
        .with_duration(DEFAULT_LEASE_DURATION_SECS)
        .with_grace(DEFAULT_LEASE_GRACE_SECS)
        .build()
        .await?;
    let (mut channel, task) = manager.watch().await;

    wait_for_leadership(&mut channel).await?;
    metrics.set_leader(true);
    info!(identity = %identity, "Acquired leader lease");

    let result = tokio::select! {
        result = work => result,
        () = wait_for_loss(&mut channel) => {
            warn!(identity = %identity, "Lost leader lease, stopping");
            Err(anyhow::anyhow!("leader lease lost"))
        }
    };

    metrics.set_leader(false);
    drop(channel);
    match task.await {
        Ok(Ok(_)) => info!("Released leader lease"),
        Ok(Err(e)) => warn!(error = %e, "Failed to release leader lease"),
        Err(e) => warn!(error = %e, "Leader election task panicked"),
    }
    result
}

#[cfg(test)]
#[path = "leader_tests.rs"]
mod leader_tests;
