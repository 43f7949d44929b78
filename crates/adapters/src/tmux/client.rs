// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux pane driver

use super::{classify_stderr, PaneDriver, TmuxError};
use crate::proc::{self, ProcessSnapshot, KILL_GRACE};
use crate::runtime;
use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};
use async_trait::async_trait;
use gt_core::AgentId;
use std::io::IsTerminal;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Tmux-backed pane driver
#[derive(Clone, Default)]
pub struct TmuxClient;

impl TmuxClient {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str], session: &str) -> Result<Output, TmuxError> {
        let description = format!("tmux {}", args.first().copied().unwrap_or(""));
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, &description)
            .await
            .map_err(|e| TmuxError::CommandFailed { command: description.clone(), stderr: e })?;
        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_stderr(&description, session, &stderr))
        }
    }

    async fn display(&self, name: &str, format: &str) -> Result<String, TmuxError> {
        let target = exact(name);
        let output = self.run(&["display-message", "-p", "-t", &target, format], name).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Exact-match target (`=name`); tmux prefix-matches bare names.
fn exact(name: &str) -> String {
    format!("={}", name)
}

fn tail_lines(text: &str, lines: u32) -> String {
    if lines == 0 {
        return text.to_string();
    }
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines as usize);
    all[start..].join("\n")
}

#[async_trait]
impl PaneDriver for TmuxClient {
    async fn new_session(&self, name: &str, cwd: &Path) -> Result<(), TmuxError> {
        if !cwd.exists() {
            return Err(TmuxError::CommandFailed {
                command: "tmux new-session".to_string(),
                stderr: format!("working directory does not exist: {}", cwd.display()),
            });
        }
        let cwd = cwd.to_string_lossy();
        self.run(&["new-session", "-d", "-s", name, "-c", &cwd], name).await?;
        tracing::info!(session = name, "session created");
        Ok(())
    }

    async fn start(&self, name: &str, cwd: &Path, command: &str) -> Result<(), TmuxError> {
        if !cwd.exists() {
            return Err(TmuxError::CommandFailed {
                command: "tmux new-session".to_string(),
                stderr: format!("working directory does not exist: {}", cwd.display()),
            });
        }
        let cwd = cwd.to_string_lossy();
        self.run(&["new-session", "-d", "-s", name, "-c", &cwd, command], name).await?;
        // Keep crash output inspectable instead of letting the pane vanish.
        let target = exact(name);
        self.run(&["set-option", "-t", &target, "remain-on-exit", "on"], name).await?;
        tracing::info!(session = name, command, "session started");
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, TmuxError> {
        let target = exact(name);
        match self.run(&["has-session", "-t", &target], name).await {
            Ok(_) => Ok(true),
            Err(TmuxError::SessionNotFound(_)) | Err(TmuxError::NoServer) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn stop(&self, name: &str) -> Result<(), TmuxError> {
        let target = exact(name);
        match self.run(&["kill-session", "-t", &target], name).await {
            Ok(_) => Ok(()),
            // Already gone is success.
            Err(TmuxError::SessionNotFound(_)) | Err(TmuxError::NoServer) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<String>, TmuxError> {
        match self.run(&["list-sessions", "-F", "#{session_name}"], "").await {
            Ok(output) => Ok(String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_string)
                .filter(|s| !s.is_empty())
                .collect()),
            Err(TmuxError::NoServer) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn send(&self, name: &str, text: &str) -> Result<(), TmuxError> {
        self.send_literal(name, text).await?;
        self.send_control(name, "Enter").await
    }

    async fn send_literal(&self, name: &str, text: &str) -> Result<(), TmuxError> {
        let target = exact(name);
        // -l = literal mode, -- = end of options (text may start with -)
        self.run(&["send-keys", "-t", &target, "-l", "--", text], name).await?;
        Ok(())
    }

    async fn send_control(&self, name: &str, key: &str) -> Result<(), TmuxError> {
        let target = exact(name);
        self.run(&["send-keys", "-t", &target, key], name).await?;
        Ok(())
    }

    async fn capture(&self, name: &str, lines: u32) -> Result<String, TmuxError> {
        let target = exact(name);
        let output = self.run(&["capture-pane", "-p", "-t", &target], name).await?;
        Ok(tail_lines(&String::from_utf8_lossy(&output.stdout), lines))
    }

    async fn capture_all(&self, name: &str) -> Result<String, TmuxError> {
        let target = exact(name);
        let output = self
            .run(&["capture-pane", "-p", "-t", &target, "-S", "-", "-E", "-"], name)
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn pane_pid(&self, name: &str) -> Result<u32, TmuxError> {
        let raw = self.display(name, "#{pane_pid}").await?;
        raw.parse().map_err(|_| TmuxError::CommandFailed {
            command: "tmux display-message".to_string(),
            stderr: format!("unparseable pane pid: {raw:?}"),
        })
    }

    async fn pane_command(&self, name: &str) -> Result<String, TmuxError> {
        self.display(name, "#{pane_current_command}").await
    }

    async fn is_pane_dead(&self, name: &str) -> Result<bool, TmuxError> {
        Ok(self.display(name, "#{pane_dead}").await? == "1")
    }

    async fn is_pane_in_mode(&self, name: &str) -> Result<bool, TmuxError> {
        Ok(self.display(name, "#{pane_in_mode}").await? == "1")
    }

    async fn set_pane_died_hook(&self, name: &str, agent_id: &AgentId) -> Result<(), TmuxError> {
        let target = exact(name);
        let hook = format!("run-shell 'echo gastown-pane-died {}'", agent_id);
        self.run(&["set-hook", "-t", &target, "pane-died", &hook], name).await?;
        Ok(())
    }

    async fn is_agent_running(&self, name: &str, runtimes: &[&str]) -> Result<bool, TmuxError> {
        if runtimes.is_empty() {
            return Ok(false);
        }
        let command = match self.pane_command(name).await {
            Ok(c) => c,
            Err(TmuxError::SessionNotFound(_)) | Err(TmuxError::NoServer) => return Ok(false),
            Err(e) => return Err(e),
        };
        if runtime::command_matches(&command, runtimes) {
            return Ok(true);
        }
        let pid = match self.pane_pid(name).await {
            Ok(p) => p,
            Err(TmuxError::SessionNotFound(_)) | Err(TmuxError::NoServer) => return Ok(false),
            Err(e) => return Err(e),
        };
        let snapshot = ProcessSnapshot::capture().await?;
        Ok(snapshot.descendants(pid).into_iter().any(|child| {
            snapshot.command_of(child).is_some_and(|c| runtime::command_matches(c, runtimes))
        }))
    }

    async fn kill_session_with_processes(&self, name: &str) -> Result<(), TmuxError> {
        match self.pane_pid(name).await {
            Ok(pid) => {
                let snapshot = ProcessSnapshot::capture().await?;
                let targets = snapshot.kill_targets(pid);
                if let Some(pgid) = snapshot.group_of(pid) {
                    proc::terminate_group(pgid, KILL_GRACE).await;
                }
                let stragglers: Vec<u32> =
                    targets.into_iter().filter(|p| proc::is_alive(*p)).collect();
                if !stragglers.is_empty() {
                    tracing::debug!(session = name, ?stragglers, "force-killing stragglers");
                    proc::terminate_pids(&stragglers, &[], Duration::ZERO).await;
                }
            }
            Err(TmuxError::SessionNotFound(_)) | Err(TmuxError::NoServer) => {}
            Err(e) => return Err(e),
        }
        self.stop(name).await
    }

    async fn kill_session_with_processes_excluding(
        &self,
        name: &str,
        exclude: &[u32],
    ) -> Result<(), TmuxError> {
        match self.pane_pid(name).await {
            Ok(pid) => {
                let snapshot = ProcessSnapshot::capture().await?;
                let targets = snapshot.kill_targets(pid);
                // Per-PID only: killpg cannot honor exclusions.
                proc::terminate_pids(&targets, exclude, KILL_GRACE).await;
            }
            Err(TmuxError::SessionNotFound(_)) | Err(TmuxError::NoServer) => {}
            Err(e) => return Err(e),
        }
        self.stop(name).await
    }

    async fn attach(&self, name: &str) -> Result<(), TmuxError> {
        if !std::io::stdin().is_terminal() {
            return Err(TmuxError::NotATty);
        }
        let target = exact(name);
        // switch-client when already inside tmux, interactive attach otherwise
        let verb =
            if std::env::var_os("TMUX").is_some() { "switch-client" } else { "attach-session" };
        let status = Command::new("tmux").args([verb, "-t", target.as_str()]).status().await.map_err(
            |e| TmuxError::CommandFailed {
                command: "tmux attach".to_string(),
                stderr: e.to_string(),
            },
        )?;
        if status.success() {
            Ok(())
        } else {
            Err(TmuxError::SessionNotFound(name.to_string()))
        }
    }

    async fn wake(&self, name: &str) -> Result<(), TmuxError> {
        let target = exact(name);
        // Best-effort: a detached session has no client to refresh.
        let _ = self.run(&["refresh-client", "-t", &target], name).await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
