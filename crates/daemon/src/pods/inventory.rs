// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod inventory: polls a discovery source and emits change events.
//!
//! Successive snapshots are diffed by agent id over `running` pods only.
//! A new agent id is `Added`, a pod whose name or IP moved is `Updated`,
//! and a vanished agent id is `Removed`. The callback runs synchronously
//! on the poll task and must return quickly.

use async_trait::async_trait;
use gt_core::{AgentId, PodEvent, PodEventKind, PodInfo};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Poll cadence when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum PodSourceError {
    #[error("pod listing failed: {0}")]
    List(String),
}

/// Supplies pod snapshots. A kube API client and a CLI-shelling lister are
/// the expected implementations.
#[async_trait]
pub trait PodSource: Send + Sync {
    async fn list(&self) -> Result<Vec<PodInfo>, PodSourceError>;
}

/// Polling inventory over one [`PodSource`].
pub struct PodInventory<S> {
    source: S,
    interval: Duration,
    known: HashMap<AgentId, PodInfo>,
}

impl<S: PodSource> PodInventory<S> {
    pub fn new(source: S) -> Self {
        Self::with_interval(source, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(source: S, interval: Duration) -> Self {
        Self { source, interval, known: HashMap::new() }
    }

    /// Reconcile one snapshot against the known set, returning the events
    /// in deterministic order: snapshot-order adds/updates, then removals
    /// sorted by agent id.
    pub fn diff(known: &mut HashMap<AgentId, PodInfo>, snapshot: Vec<PodInfo>) -> Vec<PodEvent> {
        let mut events = Vec::new();
        let mut seen: Vec<AgentId> = Vec::new();
        for pod in snapshot.into_iter().filter(|p| p.status.is_running()) {
            seen.push(pod.agent_id.clone());
            match known.get(&pod.agent_id) {
                None => {
                    known.insert(pod.agent_id.clone(), pod.clone());
                    events.push(PodEvent { kind: PodEventKind::Added, pod });
                }
                Some(previous) if previous.identity_changed(&pod) => {
                    known.insert(pod.agent_id.clone(), pod.clone());
                    events.push(PodEvent { kind: PodEventKind::Updated, pod });
                }
                Some(_) => {
                    // Same identity; refresh the stored record silently.
                    known.insert(pod.agent_id.clone(), pod);
                }
            }
        }

        let mut gone: Vec<AgentId> =
            known.keys().filter(|id| !seen.contains(id)).cloned().collect();
        gone.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        for id in gone {
            if let Some(pod) = known.remove(&id) {
                events.push(PodEvent { kind: PodEventKind::Removed, pod });
            }
        }
        events
    }

    /// Poll once and feed events to the callback.
    pub async fn poll_once<F>(&mut self, on_change: &mut F) -> Result<(), PodSourceError>
    where
        F: FnMut(PodEvent),
    {
        let snapshot = self.source.list().await?;
        for event in Self::diff(&mut self.known, snapshot) {
            on_change(event);
        }
        Ok(())
    }

    /// Poll until cancelled. Source failures are logged and retried on the
    /// next tick.
    pub async fn run<F>(mut self, cancel: CancellationToken, mut on_change: F)
    where
        F: FnMut(PodEvent) + Send,
    {
        loop {
            if let Err(e) = self.poll_once(&mut on_change).await {
                tracing::warn!(error = %e, "pod poll failed, will retry");
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
