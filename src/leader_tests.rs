// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `leader.rs`

#[cfg(test)]
mod tests {
    use crate::leader::{holder_identity, wait_for_leadership, wait_for_loss};
    use tokio::sync::watch;

    #[test]
    fn test_holder_identity_is_not_empty() {
        assert!(!holder_identity().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_leadership_resolves_when_acquired() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { wait_for_leadership(&mut rx).await });

        tx.send(true).unwrap();

        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_leadership_fails_when_task_stops() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        assert!(wait_for_leadership(&mut rx).await.is_err());
    }

    #[tokio::test]
    async fn test_wait_for_loss_resolves_when_lease_lost() {
        let (tx, mut rx) = watch::channel(true);
        let waiter = tokio::spawn(async move { wait_for_loss(&mut rx).await });

        tx.send(false).unwrap();

        waiter.await.unwrap();
    }
}
