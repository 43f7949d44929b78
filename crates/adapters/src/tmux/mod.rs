// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pane driver contract and the tmux implementation.
//!
//! [`PaneDriver`] is the uniform pane-control surface: session lifecycle,
//! keystroke delivery, capture, introspection, and full process-tree
//! teardown. [`TmuxClient`] implements it by shelling out to tmux; the
//! local and pod-pipe backends, the nudge protocol, and the pod supervisor
//! are all generic over this trait so they run against the fake in tests.

mod client;

pub use client::TmuxClient;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DriverCall, FakePane, FakePaneDriver};

use crate::proc::ProcError;
use async_trait::async_trait;
use gt_core::AgentId;
use std::path::Path;
use thiserror::Error;

/// Session-name prefixes owned by Gastown. Orphan cleanup only ever looks
/// at sessions carrying one of these.
pub const GASTOWN_PREFIXES: &[&str] = &["gt-", "hq-"];

/// Errors from pane-driver operations, classified so callers can
/// pattern-match kinds instead of scraping stderr.
#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("tmux server not running")]
    NoServer,
    #[error("session already exists: {0}")]
    SessionExists(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("tmux {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("stdin is not a terminal")]
    NotATty,
    #[error(transparent)]
    Proc(#[from] ProcError),
}

impl TmuxError {
    pub fn is_no_server(&self) -> bool {
        matches!(self, TmuxError::NoServer)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TmuxError::SessionNotFound(_))
    }
}

/// Map tmux stderr to a typed error kind.
pub(crate) fn classify_stderr(command: &str, session: &str, stderr: &str) -> TmuxError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("no server running") || lower.contains("error connecting to") {
        TmuxError::NoServer
    } else if lower.contains("duplicate session") {
        TmuxError::SessionExists(session.to_string())
    } else if lower.contains("session not found")
        || lower.contains("can't find session")
        || lower.contains("no such session")
        || lower.contains("can't find pane")
    {
        TmuxError::SessionNotFound(session.to_string())
    } else {
        TmuxError::CommandFailed { command: command.to_string(), stderr: stderr.trim().to_string() }
    }
}

/// What [`PaneDriver::cleanup_orphaned_sessions`] found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Orphaned sessions that were (or in a dry run, would be) killed.
    pub killed: Vec<String>,
    /// Sessions left alone because a recognized runtime is still inside.
    pub skipped: Vec<String>,
    /// Whether the kills were actually performed.
    pub applied: bool,
}

/// Uniform pane-control surface over one terminal multiplexer.
#[async_trait]
pub trait PaneDriver: Clone + Send + Sync + 'static {
    /// Create a detached session running the default shell.
    ///
    /// Fails with [`TmuxError::SessionExists`] if a live session already has
    /// the name. Starts the multiplexer daemon when needed — never
    /// `NoServer`.
    async fn new_session(&self, name: &str, cwd: &Path) -> Result<(), TmuxError>;

    /// Create a detached session whose pane runs `command`, with
    /// remain-on-exit enabled so crash output stays inspectable.
    async fn start(&self, name: &str, cwd: &Path, command: &str) -> Result<(), TmuxError>;

    /// Exact-match existence check; never prefix-matches.
    async fn exists(&self, name: &str) -> Result<bool, TmuxError>;

    /// Kill a session. Idempotent: a missing session is success.
    async fn stop(&self, name: &str) -> Result<(), TmuxError>;

    /// Names of all live sessions. Empty when the daemon is down.
    async fn list_sessions(&self) -> Result<Vec<String>, TmuxError>;

    /// Send `text` as literal keystrokes followed by Enter.
    async fn send(&self, name: &str, text: &str) -> Result<(), TmuxError>;

    /// Send `text` as literal keystrokes with no Enter.
    async fn send_literal(&self, name: &str, text: &str) -> Result<(), TmuxError>;

    /// Send a named key or control sequence (`C-c`, `Escape`, `Down`).
    async fn send_control(&self, name: &str, key: &str) -> Result<(), TmuxError>;

    /// Last `lines` lines of visible pane content.
    async fn capture(&self, name: &str, lines: u32) -> Result<String, TmuxError>;

    /// Full scrollback plus visible content.
    async fn capture_all(&self, name: &str) -> Result<String, TmuxError>;

    /// Like [`capture`](Self::capture), split into lines.
    async fn capture_lines(&self, name: &str, lines: u32) -> Result<Vec<String>, TmuxError> {
        Ok(self.capture(name, lines).await?.lines().map(str::to_string).collect())
    }

    /// PID of the pane's root process.
    async fn pane_pid(&self, name: &str) -> Result<u32, TmuxError>;

    /// Foreground command currently displayed for the pane.
    async fn pane_command(&self, name: &str) -> Result<String, TmuxError>;

    /// Whether the pane's process has exited (remain-on-exit corpse).
    async fn is_pane_dead(&self, name: &str) -> Result<bool, TmuxError>;

    /// Whether the pane is in an interactive mode (copy, search, …).
    async fn is_pane_in_mode(&self, name: &str) -> Result<bool, TmuxError>;

    /// Install a pane-died hook carrying `agent_id` for upstream observation.
    async fn set_pane_died_hook(&self, name: &str, agent_id: &AgentId) -> Result<(), TmuxError>;

    /// Whether one of `runtimes` is running in the pane, either as the
    /// foreground command or anywhere in the pane's descendant tree.
    /// Empty `runtimes` and missing sessions are both `false`.
    async fn is_agent_running(&self, name: &str, runtimes: &[&str]) -> Result<bool, TmuxError>;

    /// Kill the pane's whole process tree (group kill, grace, force-kill
    /// stragglers), then remove the session.
    async fn kill_session_with_processes(&self, name: &str) -> Result<(), TmuxError>;

    /// Like [`kill_session_with_processes`](Self::kill_session_with_processes)
    /// but never signals any PID in `exclude` — for callers that are
    /// themselves part of the tree.
    async fn kill_session_with_processes_excluding(
        &self,
        name: &str,
        exclude: &[u32],
    ) -> Result<(), TmuxError>;

    /// Attach the controlling terminal to the session interactively.
    async fn attach(&self, name: &str) -> Result<(), TmuxError>;

    /// Hint a detached session awake (refresh attached clients, if any).
    async fn wake(&self, name: &str) -> Result<(), TmuxError>;

    /// If `name` exists but hosts none of `runtimes`, tear it down (with
    /// processes) and create a fresh session; create it when missing.
    /// Returns `true` when a new session was created.
    async fn ensure_session_fresh(
        &self,
        name: &str,
        cwd: &Path,
        runtimes: &[&str],
    ) -> Result<bool, TmuxError> {
        if self.exists(name).await? {
            if self.is_agent_running(name, runtimes).await? {
                return Ok(false);
            }
            tracing::info!(session = name, "stale session, recreating");
            self.kill_session_with_processes(name).await?;
        }
        self.new_session(name, cwd).await?;
        Ok(true)
    }

    /// Scan Gastown-prefixed sessions and tear down those hosting none of
    /// `runtimes`. Dry-run unless `apply` is set; sessions with a live
    /// recognized runtime are never touched.
    async fn cleanup_orphaned_sessions(
        &self,
        runtimes: &[&str],
        apply: bool,
    ) -> Result<CleanupReport, TmuxError> {
        let mut report = CleanupReport { applied: apply, ..CleanupReport::default() };
        for session in self.list_sessions().await? {
            if !GASTOWN_PREFIXES.iter().any(|p| session.starts_with(p)) {
                continue;
            }
            if self.is_agent_running(&session, runtimes).await? {
                report.skipped.push(session);
                continue;
            }
            if apply {
                tracing::warn!(session = %session, "killing orphaned session");
                self.kill_session_with_processes(&session).await?;
            }
            report.killed.push(session);
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
