// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod pipe: a local pane whose single process is a kube-exec into a
//! pod-side persistent screen session.
//!
//! All state lives on the pod side; the local pane only carries keystrokes
//! and screen contents across the pipe. A dropped pipe therefore loses
//! nothing — reopening the pane reattaches the same screen session with
//! its scrollback intact.

use super::{Backend, BackendError, LocalBackend};
use crate::nudge::NudgeTiming;
use crate::tmux::{PaneDriver, TmuxError};
use async_trait::async_trait;
use gt_core::{AgentId, AgentSnapshot, PromptResponse, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reconnect attempts before a connection is abandoned.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base of the reconnect backoff schedule.
pub const RECONNECT_BASE: Duration = Duration::from_secs(2);

/// Screen session name used on the pod side.
pub const POD_SCREEN_SESSION: &str = "gastown";

#[derive(Debug, Error)]
pub enum PipeError {
    /// The bound was hit; the supervisor drops the connection entry.
    #[error("reconnect attempts exhausted after {attempts}")]
    ReconnectExceeded { attempts: u32 },
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Tmux(#[from] TmuxError),
}

/// Reconnect schedule. Injectable so tests run without wall-clock waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: MAX_RECONNECT_ATTEMPTS, base: RECONNECT_BASE }
    }
}

/// Backoff before attempt `attempt` (1-based): 0, then base·2^(n−2).
///
/// With the default 2 s base: 0, 2, 4, 8, 16 s.
pub fn backoff_delay(policy: ReconnectPolicy, attempt: u32) -> Duration {
    if attempt <= 1 {
        Duration::ZERO
    } else {
        policy.base.saturating_mul(1 << (attempt - 2).min(30))
    }
}

/// What to run in the local pane to reach the pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeSpec {
    pub pod_name: String,
    pub namespace: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub screen_session: String,
}

impl PipeSpec {
    pub fn new(pod_name: impl Into<String>) -> Self {
        Self {
            pod_name: pod_name.into(),
            namespace: None,
            kubeconfig: None,
            screen_session: POD_SCREEN_SESSION.to_string(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// The kube-exec command the pipe pane runs.
    pub fn exec_command(&self) -> String {
        let mut cmd = String::from("kubectl");
        if let Some(config) = &self.kubeconfig {
            cmd.push_str(&format!(" --kubeconfig {}", config.display()));
        }
        cmd.push_str(" exec -it ");
        cmd.push_str(&self.pod_name);
        if let Some(ns) = &self.namespace {
            cmd.push_str(&format!(" -n {}", ns));
        }
        cmd.push_str(&format!(" -- screen -x {}", self.screen_session));
        cmd
    }
}

#[derive(Debug, Default)]
struct ConnState {
    connected: bool,
    last_connected: Option<Instant>,
    reconnect_count: u32,
}

/// Snapshot of one connection for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub agent_id: AgentId,
    pub pod_name: String,
    pub session_name: SessionId,
    pub connected: bool,
    pub reconnect_count: u32,
}

/// One agent's pipe into its pod.
pub struct PodConnection<D: PaneDriver> {
    agent_id: AgentId,
    local_session: SessionId,
    spec: PipeSpec,
    driver: D,
    policy: ReconnectPolicy,
    state: Mutex<ConnState>,
    // Serializes open/close/reconnect; field mutations release `state`
    // before any subprocess work.
    op: tokio::sync::Mutex<()>,
}

impl<D: PaneDriver> PodConnection<D> {
    pub fn new(agent_id: AgentId, spec: PipeSpec, driver: D) -> Self {
        Self::with_policy(agent_id, spec, driver, ReconnectPolicy::default())
    }

    pub fn with_policy(
        agent_id: AgentId,
        spec: PipeSpec,
        driver: D,
        policy: ReconnectPolicy,
    ) -> Self {
        let local_session = agent_id.session_name();
        Self {
            agent_id,
            local_session,
            spec,
            driver,
            policy,
            state: Mutex::new(ConnState::default()),
            op: tokio::sync::Mutex::new(()),
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn pod_name(&self) -> &str {
        &self.spec.pod_name
    }

    pub fn local_session(&self) -> &SessionId {
        &self.local_session
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn reconnect_count(&self) -> u32 {
        self.state.lock().reconnect_count
    }

    pub fn last_connected(&self) -> Option<Instant> {
        self.state.lock().last_connected
    }

    pub fn status(&self) -> ConnectionStatus {
        let state = self.state.lock();
        ConnectionStatus {
            agent_id: self.agent_id.clone(),
            pod_name: self.spec.pod_name.clone(),
            session_name: self.local_session.clone(),
            connected: state.connected,
            reconnect_count: state.reconnect_count,
        }
    }

    /// Open the pipe: tear down any stale local session, start a fresh pane
    /// running the exec command with remain-on-exit, mark connected.
    pub async fn open(&self, cancel: &CancellationToken) -> Result<(), PipeError> {
        let _op = self.op.lock().await;
        self.open_locked(cancel).await
    }

    async fn open_locked(&self, cancel: &CancellationToken) -> Result<(), PipeError> {
        if cancel.is_cancelled() {
            return Err(PipeError::Cancelled);
        }
        let name = self.local_session.as_str();
        if self.driver.exists(name).await? {
            tracing::warn!(session = name, "stale pipe session, killing");
            self.driver.kill_session_with_processes(name).await?;
        }
        let command = self.spec.exec_command();
        self.driver.start(name, &std::env::temp_dir(), &command).await?;
        {
            let mut state = self.state.lock();
            state.connected = true;
            state.last_connected = Some(Instant::now());
            state.reconnect_count = 0;
        }
        tracing::info!(agent_id = %self.agent_id, pod = %self.spec.pod_name, "pipe open");
        Ok(())
    }

    /// Live only when the local session exists and its pane has not died.
    /// A dead pane means the pipe dropped.
    pub async fn is_alive(&self) -> bool {
        let name = self.local_session.as_str();
        match self.driver.exists(name).await {
            Ok(true) => {}
            _ => return false,
        }
        match self.driver.is_pane_dead(name).await {
            Ok(dead) => !dead,
            Err(_) => false,
        }
    }

    /// One bounded-backoff reconnect attempt: sleep the schedule slot,
    /// close, reopen. Refuses once the policy bound is reached.
    pub async fn reconnect(&self, cancel: &CancellationToken) -> Result<(), PipeError> {
        let _op = self.op.lock().await;
        let attempt = {
            let state = self.state.lock();
            if state.reconnect_count >= self.policy.max_attempts {
                return Err(PipeError::ReconnectExceeded { attempts: state.reconnect_count });
            }
            state.reconnect_count + 1
        };
        let delay = backoff_delay(self.policy, attempt);
        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(PipeError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.state.lock().reconnect_count = attempt;
        tracing::info!(
            agent_id = %self.agent_id,
            attempt,
            delay_s = delay.as_secs(),
            "reconnecting pipe"
        );
        self.close_locked().await;
        self.open_locked(cancel).await
    }

    /// Idempotent; never fails a shutdown path.
    pub async fn close(&self) {
        let _op = self.op.lock().await;
        self.close_locked().await;
    }

    async fn close_locked(&self) {
        self.state.lock().connected = false;
        let name = self.local_session.as_str();
        if let Err(e) = self.driver.kill_session_with_processes(name).await {
            tracing::warn!(session = name, error = %e, "pipe close");
        }
    }
}

/// Backend for pod-hosted agents: pane operations ride the pipe session.
///
/// Killing the session only severs the local pipe — the pod-side screen
/// session, and the agent inside it, survive.
#[derive(Clone)]
pub struct PodPipeBackend<D: PaneDriver> {
    inner: LocalBackend<D>,
}

impl<D: PaneDriver> PodPipeBackend<D> {
    pub fn new(driver: D) -> Self {
        Self { inner: LocalBackend::new(driver) }
    }

    pub fn with_nudge_timing(driver: D, timing: NudgeTiming) -> Self {
        Self { inner: LocalBackend::with_nudge_timing(driver, timing) }
    }
}

#[async_trait]
impl<D: PaneDriver> Backend for PodPipeBackend<D> {
    async fn has_session(&self, session: &str) -> Result<bool, BackendError> {
        self.inner.has_session(session).await
    }

    async fn kill_session(&self, session: &str) -> Result<(), BackendError> {
        self.inner.kill_session(session).await
    }

    async fn is_pane_dead(&self, session: &str) -> Result<bool, BackendError> {
        self.inner.is_pane_dead(session).await
    }

    async fn set_pane_died_hook(
        &self,
        session: &str,
        agent_id: &AgentId,
    ) -> Result<(), BackendError> {
        self.inner.set_pane_died_hook(session, agent_id).await
    }

    async fn send(&self, session: &str, text: &str) -> Result<(), BackendError> {
        self.inner.send(session, text).await
    }

    async fn send_keys(&self, session: &str, keys: &str) -> Result<(), BackendError> {
        self.inner.send_keys(session, keys).await
    }

    async fn send_input(
        &self,
        session: &str,
        text: &str,
        enter: bool,
    ) -> Result<(), BackendError> {
        self.inner.send_input(session, text, enter).await
    }

    async fn nudge_session(&self, session: &str, message: &str) -> Result<(), BackendError> {
        self.inner.nudge_session(session, message).await
    }

    async fn capture(&self, session: &str, lines: u32) -> Result<String, BackendError> {
        self.inner.capture(session, lines).await
    }

    async fn capture_all(&self, session: &str) -> Result<String, BackendError> {
        self.inner.capture_all(session).await
    }

    async fn capture_lines(
        &self,
        session: &str,
        lines: u32,
    ) -> Result<Vec<String>, BackendError> {
        self.inner.capture_lines(session, lines).await
    }

    async fn is_agent_running(&self, session: &str) -> Result<bool, BackendError> {
        self.inner.is_agent_running(session).await
    }

    async fn agent_state(&self, session: &str) -> Result<AgentSnapshot, BackendError> {
        self.inner.agent_state(session).await
    }

    async fn pane_work_dir(&self, session: &str) -> Result<PathBuf, BackendError> {
        self.inner.pane_work_dir(session).await
    }

    async fn get_environment(&self, session: &str, key: &str) -> Result<String, BackendError> {
        self.inner.get_environment(session, key).await
    }

    async fn set_environment(
        &self,
        session: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError> {
        self.inner.set_environment(session, key, value).await
    }

    async fn respond_to_prompt(
        &self,
        session: &str,
        response: &PromptResponse,
    ) -> Result<(), BackendError> {
        self.inner.respond_to_prompt(session, response).await
    }

    async fn respawn_pane(&self, session: &str) -> Result<(), BackendError> {
        self.inner.respawn_pane(session).await
    }

    async fn switch_session(
        &self,
        session: &str,
        extra_env: &HashMap<String, String>,
    ) -> Result<(), BackendError> {
        self.inner.switch_session(session, extra_env).await
    }

    async fn attach_session(&self, session: &str) -> Result<(), BackendError> {
        self.inner.attach_session(session).await
    }
}

#[cfg(test)]
#[path = "podpipe_tests.rs"]
mod tests;
