// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced backend wrapper for consistent observability

use super::{Backend, BackendError};
use async_trait::async_trait;
use gt_core::{AgentId, AgentSnapshot, PromptResponse};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::Instrument;

/// Wrapper that adds tracing to any Backend
pub struct Traced<B> {
    inner: B,
}

impl<B> Traced<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

macro_rules! log_err {
    ($result:expr, $op:literal, $session:expr) => {{
        let result = $result;
        if let Err(ref e) = result {
            if !matches!(e, BackendError::NotSupported) {
                tracing::error!(session = $session, error = %e, concat!($op, " failed"));
            }
        }
        result
    }};
}

#[async_trait]
impl<B: Backend> Backend for Traced<B> {
    async fn has_session(&self, session: &str) -> Result<bool, BackendError> {
        log_err!(self.inner.has_session(session).await, "has_session", session)
    }

    async fn kill_session(&self, session: &str) -> Result<(), BackendError> {
        async {
            tracing::info!("killing session");
            let start = std::time::Instant::now();
            let result = self.inner.kill_session(session).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "session killed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "kill failed"),
            }
            result
        }
        .instrument(tracing::info_span!("backend.kill", session))
        .await
    }

    async fn is_pane_dead(&self, session: &str) -> Result<bool, BackendError> {
        log_err!(self.inner.is_pane_dead(session).await, "is_pane_dead", session)
    }

    async fn set_pane_died_hook(
        &self,
        session: &str,
        agent_id: &AgentId,
    ) -> Result<(), BackendError> {
        log_err!(
            self.inner.set_pane_died_hook(session, agent_id).await,
            "set_pane_died_hook",
            session
        )
    }

    async fn send(&self, session: &str, text: &str) -> Result<(), BackendError> {
        tracing::info_span!("backend.send", session)
            .in_scope(|| tracing::debug!(text_len = text.len(), "sending"));
        log_err!(self.inner.send(session, text).await, "send", session)
    }

    async fn send_keys(&self, session: &str, keys: &str) -> Result<(), BackendError> {
        log_err!(self.inner.send_keys(session, keys).await, "send_keys", session)
    }

    async fn send_input(
        &self,
        session: &str,
        text: &str,
        enter: bool,
    ) -> Result<(), BackendError> {
        log_err!(self.inner.send_input(session, text, enter).await, "send_input", session)
    }

    async fn nudge_session(&self, session: &str, message: &str) -> Result<(), BackendError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.nudge_session(session, message).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "nudge delivered"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "nudge failed"),
            }
            result
        }
        .instrument(tracing::info_span!("backend.nudge", session, msg_len = message.len()))
        .await
    }

    async fn capture(&self, session: &str, lines: u32) -> Result<String, BackendError> {
        log_err!(self.inner.capture(session, lines).await, "capture", session)
    }

    async fn capture_all(&self, session: &str) -> Result<String, BackendError> {
        log_err!(self.inner.capture_all(session).await, "capture_all", session)
    }

    async fn capture_lines(
        &self,
        session: &str,
        lines: u32,
    ) -> Result<Vec<String>, BackendError> {
        log_err!(self.inner.capture_lines(session, lines).await, "capture_lines", session)
    }

    async fn is_agent_running(&self, session: &str) -> Result<bool, BackendError> {
        log_err!(self.inner.is_agent_running(session).await, "is_agent_running", session)
    }

    async fn agent_state(&self, session: &str) -> Result<AgentSnapshot, BackendError> {
        log_err!(self.inner.agent_state(session).await, "agent_state", session)
    }

    async fn pane_work_dir(&self, session: &str) -> Result<PathBuf, BackendError> {
        log_err!(self.inner.pane_work_dir(session).await, "pane_work_dir", session)
    }

    async fn get_environment(&self, session: &str, key: &str) -> Result<String, BackendError> {
        log_err!(self.inner.get_environment(session, key).await, "get_environment", session)
    }

    async fn set_environment(
        &self,
        session: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError> {
        log_err!(self.inner.set_environment(session, key, value).await, "set_environment", session)
    }

    async fn respond_to_prompt(
        &self,
        session: &str,
        response: &PromptResponse,
    ) -> Result<(), BackendError> {
        log_err!(
            self.inner.respond_to_prompt(session, response).await,
            "respond_to_prompt",
            session
        )
    }

    async fn respawn_pane(&self, session: &str) -> Result<(), BackendError> {
        tracing::info!(session, "respawning pane");
        log_err!(self.inner.respawn_pane(session).await, "respawn_pane", session)
    }

    async fn switch_session(
        &self,
        session: &str,
        extra_env: &HashMap<String, String>,
    ) -> Result<(), BackendError> {
        tracing::info!(session, env_count = extra_env.len(), "switching session");
        log_err!(self.inner.switch_session(session, extra_env).await, "switch_session", session)
    }

    async fn attach_session(&self, session: &str) -> Result<(), BackendError> {
        log_err!(self.inner.attach_session(session).await, "attach_session", session)
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
