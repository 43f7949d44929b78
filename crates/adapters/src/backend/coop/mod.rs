// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coop backend: the Backend surface over a per-agent HTTP sidecar.
//!
//! Each agent runs under a coop supervisor that wraps the runtime in a PTY
//! and exposes pane state over HTTP plus a WebSocket state stream. Session
//! names bind to base URLs at registration time; every operation resolves
//! the name and talks to that sidecar.

pub(crate) mod http;
mod ws;

pub use ws::{watch_state, CoopStateWatcher};

use super::{Backend, BackendError};
use async_trait::async_trait;
use gt_core::{AgentId, AgentSnapshot, PromptResponse};
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct CoopSession {
    base_url: String,
    token: Option<String>,
}

/// Backend speaking to coop sidecars over HTTP.
#[derive(Clone, Default)]
pub struct CoopBackend {
    sessions: Arc<RwLock<HashMap<String, CoopSession>>>,
}

impl CoopBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session` to a sidecar base URL. Trailing slashes are stripped.
    pub fn add_session(&self, session: &str, base_url: &str, token: Option<String>) {
        let base_url = base_url.trim_end_matches('/').to_string();
        self.sessions.write().insert(session.to_string(), CoopSession { base_url, token });
    }

    pub fn remove_session(&self, session: &str) {
        self.sessions.write().remove(session);
    }

    /// Base URL and token for a registered session, for the state watcher.
    pub fn session_endpoint(&self, session: &str) -> Option<(String, Option<String>)> {
        self.sessions.read().get(session).map(|s| (s.base_url.clone(), s.token.clone()))
    }

    fn session(&self, session: &str) -> Result<CoopSession, BackendError> {
        self.sessions
            .read()
            .get(session)
            .cloned()
            .ok_or_else(|| BackendError::UnknownSession(session.to_string()))
    }

    async fn get(&self, session: &str, path: &str) -> Result<http::HttpResponse, BackendError> {
        let s = self.session(session)?;
        http::get(&s.base_url, path, s.token.as_deref()).await?.into_success()
    }

    async fn post(
        &self,
        session: &str,
        path: &str,
        body: &str,
    ) -> Result<http::HttpResponse, BackendError> {
        let s = self.session(session)?;
        http::post(&s.base_url, path, body, s.token.as_deref()).await?.into_success()
    }

    async fn put(
        &self,
        session: &str,
        path: &str,
        body: &str,
    ) -> Result<http::HttpResponse, BackendError> {
        let s = self.session(session)?;
        http::put(&s.base_url, path, body, s.token.as_deref()).await?.into_success()
    }
}

/// Decide liveness from a `/api/v1/health` body: running with a real PID.
pub(crate) fn health_means_running(body: &str) -> bool {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    let running = json.get("status").and_then(|v| v.as_str()) == Some("running");
    let has_pid = json.get("pid").is_some_and(|v| !v.is_null());
    running && has_pid
}

fn tail(text: &str, lines: u32) -> String {
    if lines == 0 {
        return text.to_string();
    }
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines as usize);
    all[start..].join("\n")
}

#[async_trait]
impl Backend for CoopBackend {
    async fn has_session(&self, session: &str) -> Result<bool, BackendError> {
        let Ok(s) = self.session(session) else {
            return Ok(false);
        };
        // Unreachable is a valid observation, never an error.
        match http::get(&s.base_url, "/api/v1/health", s.token.as_deref()).await {
            Ok(response) if response.is_success() => Ok(health_means_running(&response.body)),
            Ok(_) | Err(_) => Ok(false),
        }
    }

    async fn kill_session(&self, session: &str) -> Result<(), BackendError> {
        let body = json!({ "signal": "SIGTERM" }).to_string();
        self.post(session, "/api/v1/signal", &body).await?;
        Ok(())
    }

    async fn is_pane_dead(&self, session: &str) -> Result<bool, BackendError> {
        Ok(!self.has_session(session).await?)
    }

    async fn set_pane_died_hook(
        &self,
        _session: &str,
        _agent_id: &AgentId,
    ) -> Result<(), BackendError> {
        // Exit observation comes from the WebSocket exit channel instead.
        Err(BackendError::NotSupported)
    }

    async fn send(&self, session: &str, text: &str) -> Result<(), BackendError> {
        // Prefer the nudge endpoint; fall back to raw input when the
        // sidecar reports non-delivery or predates the endpoint.
        let nudge_body = json!({ "message": text }).to_string();
        let s = self.session(session)?;
        match http::post(&s.base_url, "/api/v1/agent/nudge", &nudge_body, s.token.as_deref()).await
        {
            Ok(response) if response.is_success() => {
                let delivered = response
                    .json()
                    .ok()
                    .and_then(|j| j.get("delivered").and_then(|v| v.as_bool()))
                    .unwrap_or(true);
                if delivered {
                    return Ok(());
                }
                tracing::warn!(session, "nudge not delivered, falling back to raw input");
            }
            Ok(_) | Err(_) => {}
        }
        self.send_input(session, text, true).await
    }

    async fn send_keys(&self, session: &str, keys: &str) -> Result<(), BackendError> {
        let keys: Vec<&str> = keys.split_whitespace().collect();
        let body = json!({ "keys": keys }).to_string();
        self.post(session, "/api/v1/input/keys", &body).await?;
        Ok(())
    }

    async fn send_input(
        &self,
        session: &str,
        text: &str,
        enter: bool,
    ) -> Result<(), BackendError> {
        let body = json!({ "text": text, "enter": enter }).to_string();
        self.post(session, "/api/v1/input", &body).await?;
        Ok(())
    }

    async fn nudge_session(&self, session: &str, message: &str) -> Result<(), BackendError> {
        let body = json!({ "message": message }).to_string();
        let response = self.post(session, "/api/v1/agent/nudge", &body).await?;
        let json = response.json()?;
        if json.get("delivered").and_then(|v| v.as_bool()) == Some(false) {
            let reason =
                json.get("reason").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
            return Err(BackendError::NudgeRejected(reason));
        }
        Ok(())
    }

    async fn capture(&self, session: &str, lines: u32) -> Result<String, BackendError> {
        let response = self.get(session, "/api/v1/screen/text").await?;
        Ok(tail(&response.body, lines))
    }

    async fn capture_all(&self, session: &str) -> Result<String, BackendError> {
        let response = self.get(session, "/api/v1/screen/text").await?;
        Ok(response.body)
    }

    async fn capture_lines(
        &self,
        session: &str,
        lines: u32,
    ) -> Result<Vec<String>, BackendError> {
        Ok(self.capture(session, lines).await?.lines().map(str::to_string).collect())
    }

    async fn is_agent_running(&self, session: &str) -> Result<bool, BackendError> {
        let response = self.get(session, "/api/v1/status").await?;
        let json = response.json()?;
        Ok(json.get("state").and_then(|v| v.as_str()) == Some("running"))
    }

    async fn agent_state(&self, session: &str) -> Result<AgentSnapshot, BackendError> {
        let response = self.get(session, "/api/v1/agent/state").await?;
        serde_json::from_str(&response.body).map_err(|e| BackendError::Transport {
            status: response.status,
            body: format!("invalid agent state: {}", e),
        })
    }

    async fn pane_work_dir(&self, session: &str) -> Result<PathBuf, BackendError> {
        let response = self.get(session, "/api/v1/session/cwd").await?;
        let json = response.json()?;
        let cwd = json.get("cwd").and_then(|v| v.as_str()).ok_or_else(|| {
            BackendError::Transport { status: response.status, body: "missing cwd".to_string() }
        })?;
        Ok(PathBuf::from(cwd))
    }

    async fn get_environment(&self, session: &str, key: &str) -> Result<String, BackendError> {
        let s = self.session(session)?;
        let path = format!("/api/v1/env/{}", key);
        let response = http::get(&s.base_url, &path, s.token.as_deref()).await?;
        if response.status == 404 {
            return Err(BackendError::EnvNotFound(key.to_string()));
        }
        let response = response.into_success()?;
        let json = response.json()?;
        Ok(json.get("value").and_then(|v| v.as_str()).unwrap_or_default().to_string())
    }

    async fn set_environment(
        &self,
        session: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError> {
        let path = format!("/api/v1/env/{}", key);
        let body = json!({ "value": value }).to_string();
        self.put(session, &path, &body).await?;
        Ok(())
    }

    async fn respond_to_prompt(
        &self,
        session: &str,
        response: &PromptResponse,
    ) -> Result<(), BackendError> {
        let body = serde_json::to_string(response).map_err(|e| BackendError::Transport {
            status: 0,
            body: format!("unencodable response: {}", e),
        })?;
        let reply = self.post(session, "/api/v1/agent/respond", &body).await?;
        if let Ok(json) = reply.json() {
            if json.get("delivered").and_then(|v| v.as_bool()) == Some(false) {
                let reason =
                    json.get("reason").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
                return Err(BackendError::NudgeRejected(reason));
            }
        }
        Ok(())
    }

    async fn respawn_pane(&self, session: &str) -> Result<(), BackendError> {
        self.switch_session(session, &HashMap::new()).await
    }

    async fn switch_session(
        &self,
        session: &str,
        extra_env: &HashMap<String, String>,
    ) -> Result<(), BackendError> {
        let body = json!({ "extra_env": extra_env }).to_string();
        self.put(session, "/api/v1/session/switch", &body).await?;
        Ok(())
    }

    async fn attach_session(&self, _session: &str) -> Result<(), BackendError> {
        Err(BackendError::NotSupported)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
