// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod lifecycle scenarios: discovery drives pipes, drops drive reconnects.

use async_trait::async_trait;
use gt_adapters::backend::{backoff_delay, PipeError, PipeSpec, PodConnection, ReconnectPolicy};
use gt_adapters::tmux::FakePaneDriver;
use gt_core::{AgentId, PodInfo, PodStatus};
use gt_daemon::{PipeServer, PodInventory, PodSource, PodSourceError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct ScriptedSource {
    snapshots: Arc<Mutex<Vec<Vec<PodInfo>>>>,
}

#[async_trait]
impl PodSource for ScriptedSource {
    async fn list(&self) -> Result<Vec<PodInfo>, PodSourceError> {
        let mut snapshots = self.snapshots.lock();
        if snapshots.len() > 1 {
            Ok(snapshots.remove(0))
        } else {
            Ok(snapshots.first().cloned().unwrap_or_default())
        }
    }
}

fn running_pod(agent: &str, pod: &str) -> PodInfo {
    PodInfo::builder(agent).pod_name(pod).status(PodStatus::Running).build()
}

#[tokio::test]
async fn fleet_follows_inventory() {
    let driver = FakePaneDriver::new();
    let server = Arc::new(
        PipeServer::new("rig1", "gastown", driver.clone())
            .with_policy(ReconnectPolicy { max_attempts: 5, base: Duration::ZERO })
            .with_health_interval(Duration::from_millis(20)),
    );
    let source = ScriptedSource::default();
    source.snapshots.lock().push(vec![
        running_pod("rig1/polecats/alpha", "pod-1"),
        running_pod("rig1/polecats/bravo", "pod-2"),
    ]);

    let cancel = CancellationToken::new();
    let inventory = PodInventory::with_interval(source.clone(), Duration::from_millis(10));
    let run = tokio::spawn({
        let server = server.clone();
        let cancel = cancel.clone();
        async move { server.run(inventory, cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Two pipes, each running a kube exec into its pod's screen session.
    for (session, pod) in [("gt-rig1-alpha", "pod-1"), ("gt-rig1-bravo", "pod-2")] {
        let pane = driver.pane(session).unwrap_or_else(|| panic!("missing {session}"));
        assert!(pane.command.contains(pod), "command: {}", pane.command);
        assert!(pane.command.contains("screen -x"), "command: {}", pane.command);
    }

    // bravo's pod goes away; its pipe session follows.
    source.snapshots.lock().push(vec![running_pod("rig1/polecats/alpha", "pod-1")]);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(driver.pane("gt-rig1-bravo").is_none());
    assert_eq!(server.status().pod_count, 1);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), run).await.unwrap().unwrap();
}

#[test]
fn reconnect_backoff_schedule_is_geometric() {
    let policy = ReconnectPolicy::default();
    let delays: Vec<u64> = (1..=5).map(|k| backoff_delay(policy, k).as_secs()).collect();
    assert_eq!(delays, vec![0, 2, 4, 8, 16]);
    // Total elapsed before attempt k is 2·(2^(k−1) − 1) seconds.
    for k in 1..=5u32 {
        let total: u64 = delays[..k as usize].iter().sum();
        assert_eq!(total, 2 * ((1u64 << (k - 1)) - 1));
    }
}

#[tokio::test]
async fn reconnect_gives_up_at_the_bound() {
    let driver = FakePaneDriver::new();
    let connection = PodConnection::with_policy(
        AgentId::new("rig1/polecats/alpha"),
        PipeSpec::new("pod-1"),
        driver.clone(),
        ReconnectPolicy { max_attempts: 5, base: Duration::ZERO },
    );
    let cancel = CancellationToken::new();
    driver.set_fail_starts(true);

    for attempt in 1..=5u32 {
        assert!(connection.reconnect(&cancel).await.is_err());
        assert_eq!(connection.reconnect_count(), attempt);
    }
    assert!(matches!(
        connection.reconnect(&cancel).await,
        Err(PipeError::ReconnectExceeded { attempts: 5 })
    ));

    // A successful open resets the budget.
    driver.set_fail_starts(false);
    connection.open(&cancel).await.unwrap();
    assert_eq!(connection.reconnect_count(), 0);
    assert!(connection.is_alive().await);
}
