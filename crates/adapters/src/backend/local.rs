// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local backend: the Backend surface over a tmux pane driver.
//!
//! Thin adapter — delivery and teardown are the driver's; coop-only
//! operations (state queries, environment, respawn/switch) come back
//! `NotSupported` and callers fall back to pane-level inspection.

use super::{Backend, BackendError};
use crate::nudge::{NudgeTiming, Nudger, PaneTarget};
use crate::tmux::PaneDriver;
use async_trait::async_trait;
use gt_core::{AgentId, AgentSnapshot, PromptResponse};
use std::collections::HashMap;
use std::path::PathBuf;

/// Backend over a local pane driver.
#[derive(Clone)]
pub struct LocalBackend<D: PaneDriver> {
    driver: D,
    nudger: Nudger,
}

impl<D: PaneDriver> LocalBackend<D> {
    pub fn new(driver: D) -> Self {
        Self { driver, nudger: Nudger::new() }
    }

    pub fn with_nudge_timing(driver: D, timing: NudgeTiming) -> Self {
        Self { driver, nudger: Nudger::with_timing(timing) }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[async_trait]
impl<D: PaneDriver> Backend for LocalBackend<D> {
    async fn has_session(&self, session: &str) -> Result<bool, BackendError> {
        Ok(self.driver.exists(session).await?)
    }

    async fn kill_session(&self, session: &str) -> Result<(), BackendError> {
        Ok(self.driver.kill_session_with_processes(session).await?)
    }

    async fn is_pane_dead(&self, session: &str) -> Result<bool, BackendError> {
        Ok(self.driver.is_pane_dead(session).await?)
    }

    async fn set_pane_died_hook(
        &self,
        session: &str,
        agent_id: &AgentId,
    ) -> Result<(), BackendError> {
        Ok(self.driver.set_pane_died_hook(session, agent_id).await?)
    }

    async fn send(&self, session: &str, text: &str) -> Result<(), BackendError> {
        Ok(self.driver.send(session, text).await?)
    }

    async fn send_keys(&self, session: &str, keys: &str) -> Result<(), BackendError> {
        for key in keys.split_whitespace() {
            self.driver.send_control(session, key).await?;
        }
        Ok(())
    }

    async fn send_input(
        &self,
        _session: &str,
        _text: &str,
        _enter: bool,
    ) -> Result<(), BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn nudge_session(&self, session: &str, message: &str) -> Result<(), BackendError> {
        let target = PaneTarget::new(&self.driver, session);
        self.nudger.run(&target, message).await?;
        Ok(())
    }

    async fn capture(&self, session: &str, lines: u32) -> Result<String, BackendError> {
        Ok(self.driver.capture(session, lines).await?)
    }

    async fn capture_all(&self, session: &str) -> Result<String, BackendError> {
        Ok(self.driver.capture_all(session).await?)
    }

    async fn capture_lines(
        &self,
        session: &str,
        lines: u32,
    ) -> Result<Vec<String>, BackendError> {
        Ok(self.driver.capture_lines(session, lines).await?)
    }

    async fn is_agent_running(&self, _session: &str) -> Result<bool, BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn agent_state(&self, _session: &str) -> Result<AgentSnapshot, BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn pane_work_dir(&self, _session: &str) -> Result<PathBuf, BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn get_environment(&self, _session: &str, _key: &str) -> Result<String, BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn set_environment(
        &self,
        _session: &str,
        _key: &str,
        _value: &str,
    ) -> Result<(), BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn respond_to_prompt(
        &self,
        _session: &str,
        _response: &PromptResponse,
    ) -> Result<(), BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn respawn_pane(&self, _session: &str) -> Result<(), BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn switch_session(
        &self,
        _session: &str,
        _extra_env: &HashMap<String, String>,
    ) -> Result<(), BackendError> {
        Err(BackendError::NotSupported)
    }

    async fn attach_session(&self, session: &str) -> Result<(), BackendError> {
        Ok(self.driver.attach(session).await?)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
