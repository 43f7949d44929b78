// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Backend surface and its three implementations.
//!
//! Higher layers steer agents exclusively through [`Backend`]: a local tmux
//! pane, a coop sidecar over HTTP/WebSocket, or a pod pipe are all the same
//! operation set. Backends return [`BackendError::NotSupported`] for
//! operations outside their transport; callers tolerate it and fall back
//! where sensible.

pub mod coop;
mod local;
mod podpipe;
mod resolve;
mod traced;

pub use coop::{CoopBackend, CoopStateWatcher};
pub use local::LocalBackend;
pub use podpipe::{
    backoff_delay, ConnectionStatus, PipeError, PipeSpec, PodConnection, PodPipeBackend,
    ReconnectPolicy, MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE,
};
pub use resolve::{BackendResolver, MetadataSource, ResolvedBackend};
pub use traced::Traced;

use crate::nudge::NudgeError;
use crate::tmux::TmuxError;
use async_trait::async_trait;
use gt_core::{AgentId, AgentSnapshot, PromptResponse};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend's transport cannot express this operation. Not a bug.
    #[error("operation not supported by this backend")]
    NotSupported,
    /// No base URL was registered under this session name.
    #[error("session not registered: {0}")]
    UnknownSession(String),
    /// Environment variable lookup came back 404.
    #[error("environment variable not set: {0}")]
    EnvNotFound(String),
    /// Non-2xx response or unparseable body; carries a body excerpt.
    #[error("transport error (HTTP {status}): {body}")]
    Transport { status: u16, body: String },
    /// TCP/WebSocket connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The remote reported the nudge as undelivered.
    #[error("nudge not delivered: {0}")]
    NudgeRejected(String),
    #[error(transparent)]
    Tmux(#[from] TmuxError),
    #[error(transparent)]
    Nudge(#[from] NudgeError),
}

impl BackendError {
    pub fn is_not_supported(&self) -> bool {
        matches!(self, BackendError::NotSupported)
    }
}

/// Uniform agent-session control surface.
///
/// Every operation takes the session name it targets; how that name binds
/// to a transport endpoint is the backend's business.
#[async_trait]
pub trait Backend: Send + Sync {
    // Session existence & lifecycle
    async fn has_session(&self, session: &str) -> Result<bool, BackendError>;
    async fn kill_session(&self, session: &str) -> Result<(), BackendError>;
    async fn is_pane_dead(&self, session: &str) -> Result<bool, BackendError>;
    async fn set_pane_died_hook(
        &self,
        session: &str,
        agent_id: &AgentId,
    ) -> Result<(), BackendError>;

    // Pane I/O
    /// Send a line of text followed by Enter.
    async fn send(&self, session: &str, text: &str) -> Result<(), BackendError>;
    /// Send space-separated named keys (`C-c Escape Down`).
    async fn send_keys(&self, session: &str, keys: &str) -> Result<(), BackendError>;
    /// Send raw text, optionally followed by Enter.
    async fn send_input(&self, session: &str, text: &str, enter: bool)
        -> Result<(), BackendError>;
    /// Deliver a message onto the agent's input line via the nudge protocol.
    async fn nudge_session(&self, session: &str, message: &str) -> Result<(), BackendError>;
    /// Last `lines` lines of visible content; everything for `0`.
    async fn capture(&self, session: &str, lines: u32) -> Result<String, BackendError>;
    async fn capture_all(&self, session: &str) -> Result<String, BackendError>;
    async fn capture_lines(&self, session: &str, lines: u32)
        -> Result<Vec<String>, BackendError>;

    // Introspection
    async fn is_agent_running(&self, session: &str) -> Result<bool, BackendError>;
    async fn agent_state(&self, session: &str) -> Result<AgentSnapshot, BackendError>;
    async fn pane_work_dir(&self, session: &str) -> Result<PathBuf, BackendError>;
    async fn get_environment(&self, session: &str, key: &str) -> Result<String, BackendError>;
    async fn set_environment(
        &self,
        session: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError>;

    // Control
    async fn respond_to_prompt(
        &self,
        session: &str,
        response: &PromptResponse,
    ) -> Result<(), BackendError>;
    async fn respawn_pane(&self, session: &str) -> Result<(), BackendError>;
    async fn switch_session(
        &self,
        session: &str,
        extra_env: &HashMap<String, String>,
    ) -> Result<(), BackendError>;
    async fn attach_session(&self, session: &str) -> Result<(), BackendError>;
}
