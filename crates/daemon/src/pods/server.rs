// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipe supervisor: one long-running loop keeping a rig's pod pipes alive.
//!
//! Inventory events drive connection lifecycle (open on `Added`, replace
//! on `Updated`, close on `Removed`); a health ticker reconnects dropped
//! pipes with bounded backoff and drops entries whose reconnect budget is
//! spent — the next inventory pass re-drives them if the pod is still
//! there. Shutdown closes every pipe within a drain deadline.

use super::inventory::{PodInventory, PodSource};
use gt_adapters::backend::{ConnectionStatus, PipeError, PipeSpec, PodConnection, ReconnectPolicy};
use gt_adapters::tmux::PaneDriver;
use gt_core::{AgentId, PodEvent, PodEventKind, PodInfo};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Health-check cadence when none is configured.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on graceful-shutdown draining.
pub const DRAIN_DEADLINE: Duration = Duration::from_secs(15);

/// Immutable status snapshot, safe to read concurrently with the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub rig: String,
    pub namespace: String,
    pub connections: Vec<ConnectionStatus>,
    pub pod_count: usize,
}

/// Supervisor for one rig's pod pipes.
pub struct PipeServer<D: PaneDriver> {
    rig: String,
    namespace: String,
    driver: D,
    policy: ReconnectPolicy,
    health_interval: Duration,
    connections: Arc<RwLock<HashMap<AgentId, Arc<PodConnection<D>>>>>,
}

impl<D: PaneDriver> PipeServer<D> {
    pub fn new(rig: impl Into<String>, namespace: impl Into<String>, driver: D) -> Self {
        Self {
            rig: rig.into(),
            namespace: namespace.into(),
            driver,
            policy: ReconnectPolicy::default(),
            health_interval: DEFAULT_HEALTH_INTERVAL,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Override the reconnect schedule (tests run with a zero base).
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    /// Snapshot of the rig's connections, sorted by agent id.
    pub fn status(&self) -> ServerStatus {
        let connections = self.connections.read();
        let mut statuses: Vec<ConnectionStatus> =
            connections.values().map(|c| c.status()).collect();
        statuses.sort_by(|a, b| a.agent_id.as_str().cmp(b.agent_id.as_str()));
        ServerStatus {
            rig: self.rig.clone(),
            namespace: self.namespace.clone(),
            pod_count: statuses.len(),
            connections: statuses,
        }
    }

    /// Run until cancelled: poll the inventory, dispatch its events, and
    /// health-check connections. Returns after draining on shutdown.
    pub async fn run<S>(&self, inventory: PodInventory<S>, cancel: CancellationToken)
    where
        S: PodSource + Send + 'static,
    {
        let child = cancel.child_token();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let inventory_task = tokio::spawn(inventory.run(child.clone(), move |event| {
            // Synchronous callback: hand off and return.
            let _ = event_tx.send(event);
        }));

        let mut health = tokio::time::interval(self.health_interval);
        health.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first interval tick fires immediately; skip it.
        health.tick().await;

        tracing::info!(rig = %self.rig, namespace = %self.namespace, "pipe server running");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = event_rx.recv() => match event {
                    Some(event) => self.handle_pod_event(event, &child).await,
                    None => break,
                },
                _ = health.tick() => self.health_sweep(&child).await,
            }
        }

        child.cancel();
        if tokio::time::timeout(DRAIN_DEADLINE, async {
            let _ = inventory_task.await;
            self.close_all().await;
        })
        .await
        .is_err()
        {
            tracing::warn!(rig = %self.rig, "drain deadline hit, abandoning remaining pipes");
        }
        tracing::info!(rig = %self.rig, "pipe server stopped");
    }

    async fn handle_pod_event(&self, event: PodEvent, cancel: &CancellationToken) {
        match event.kind {
            PodEventKind::Added => {
                tracing::info!(agent_id = %event.pod.agent_id, pod = %event.pod.pod_name, "pod added");
                self.open_connection(event.pod, cancel).await;
            }
            PodEventKind::Updated => {
                // Pod identity changed: the old pipe points nowhere.
                tracing::info!(agent_id = %event.pod.agent_id, pod = %event.pod.pod_name, "pod updated");
                let existing = self.connections.write().remove(&event.pod.agent_id);
                if let Some(connection) = existing {
                    connection.close().await;
                }
                self.open_connection(event.pod, cancel).await;
            }
            PodEventKind::Removed => {
                tracing::info!(agent_id = %event.pod.agent_id, "pod removed");
                let existing = self.connections.write().remove(&event.pod.agent_id);
                if let Some(connection) = existing {
                    connection.close().await;
                }
            }
        }
    }

    async fn open_connection(&self, pod: PodInfo, cancel: &CancellationToken) {
        let spec = PipeSpec::new(pod.pod_name.clone()).namespace(pod.namespace.clone());
        let connection = Arc::new(PodConnection::with_policy(
            pod.agent_id.clone(),
            spec,
            self.driver.clone(),
            self.policy,
        ));
        match connection.open(cancel).await {
            Ok(()) => {
                self.connections.write().insert(pod.agent_id, connection);
            }
            Err(e) => {
                // No entry tracked; the next inventory pass re-drives it.
                tracing::warn!(agent_id = %pod.agent_id, error = %e, "pipe open failed");
            }
        }
    }

    async fn health_sweep(&self, cancel: &CancellationToken) {
        let connections: Vec<(AgentId, Arc<PodConnection<D>>)> = self
            .connections
            .read()
            .iter()
            .map(|(id, conn)| (id.clone(), conn.clone()))
            .collect();

        for (agent_id, connection) in connections {
            if connection.is_alive().await {
                continue;
            }
            match connection.reconnect(cancel).await {
                Ok(()) => {
                    tracing::info!(%agent_id, "pipe reconnected");
                }
                Err(PipeError::ReconnectExceeded { attempts }) => {
                    tracing::warn!(%agent_id, attempts, "reconnect budget spent, dropping");
                    self.connections.write().remove(&agent_id);
                }
                Err(PipeError::Cancelled) => return,
                Err(e) => {
                    tracing::warn!(%agent_id, error = %e, "reconnect failed, will retry");
                }
            }
        }
    }

    async fn close_all(&self) {
        let connections: Vec<Arc<PodConnection<D>>> =
            self.connections.write().drain().map(|(_, conn)| conn).collect();
        for connection in connections {
            connection.close().await;
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
