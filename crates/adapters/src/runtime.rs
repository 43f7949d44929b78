// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-runtime detection helpers.
//!
//! A runtime counts as "running" when its name matches the pane's
//! foreground command or any descendant in the pane's process tree. The
//! Claude specialization also accepts a bare semantic version as the
//! foreground command — the tool sometimes titles its pane with its
//! version string.

use crate::tmux::{PaneDriver, TmuxError};
use regex::Regex;
use std::sync::LazyLock;

/// Process names that mean a Claude Code agent is alive.
pub const CLAUDE_RUNTIMES: &[&str] = &["claude", "node"];

/// Process names for any recognized interactive coding agent.
pub const KNOWN_RUNTIMES: &[&str] = &["claude", "node", "opencode", "codex"];

static BARE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern, cannot fail to compile.
    match Regex::new(r"^\d+\.\d+\.\d+") {
        Ok(re) => re,
        Err(_) => unreachable!("invalid version pattern"),
    }
});

/// Whether `command` names one of `names`, comparing by executable basename.
pub fn command_matches(command: &str, names: &[&str]) -> bool {
    let base = command
        .split_whitespace()
        .next()
        .map(|head| head.rsplit('/').next().unwrap_or(head))
        .unwrap_or("");
    names.iter().any(|name| base == *name)
}

/// Whether a pane title looks like a bare `MAJOR.MINOR.PATCH` version.
pub fn looks_like_bare_version(command: &str) -> bool {
    BARE_VERSION.is_match(command.trim())
}

/// Claude-specific liveness check with the version-title heuristic.
pub async fn is_claude_running<D: PaneDriver>(
    driver: &D,
    session: &str,
) -> Result<bool, TmuxError> {
    match driver.pane_command(session).await {
        Ok(command) if looks_like_bare_version(&command) => return Ok(true),
        Ok(_) => {}
        Err(TmuxError::SessionNotFound(_)) | Err(TmuxError::NoServer) => return Ok(false),
        Err(e) => return Err(e),
    }
    driver.is_agent_running(session, CLAUDE_RUNTIMES).await
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
