// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake pane driver for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{PaneDriver, TmuxError};
use async_trait::async_trait;
use gt_core::AgentId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded driver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    NewSession { name: String, cwd: PathBuf },
    Start { name: String, cwd: PathBuf, command: String },
    Stop { name: String },
    Send { name: String, text: String },
    SendLiteral { name: String, text: String },
    SendControl { name: String, key: String },
    Capture { name: String, lines: u32 },
    CaptureAll { name: String },
    SetPaneDiedHook { name: String, agent_id: AgentId },
    KillWithProcesses { name: String },
    KillWithProcessesExcluding { name: String, exclude: Vec<u32> },
    Attach { name: String },
    Wake { name: String },
}

/// Scripted pane state.
///
/// The pane renders as `lines` followed by a `> {input}` prompt line.
/// `C-c` clears the input, `Enter` submits it, literal sends append to it —
/// enough behavior for the nudge state machine to run end to end. Text
/// queued via [`FakePaneDriver::queue_typing`] is appended after the next
/// literal send, simulating an operator typing mid-injection.
#[derive(Debug, Clone)]
pub struct FakePane {
    pub cwd: PathBuf,
    pub command: String,
    pub lines: Vec<String>,
    pub input: String,
    pub pid: u32,
    pub dead: bool,
    pub in_mode: bool,
    pub running_runtimes: Vec<String>,
    pub typing_queue: VecDeque<String>,
    pub died_hook: Option<AgentId>,
}

impl FakePane {
    fn new(cwd: PathBuf, command: String, pid: u32) -> Self {
        Self {
            cwd,
            command,
            lines: Vec::new(),
            input: String::new(),
            pid,
            dead: false,
            in_mode: false,
            running_runtimes: Vec::new(),
            typing_queue: VecDeque::new(),
            died_hook: None,
        }
    }

    fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("> {}", self.input));
        out
    }
}

#[derive(Default)]
struct FakeState {
    sessions: HashMap<String, FakePane>,
    calls: Vec<DriverCall>,
    next_pid: u32,
    fail_starts: bool,
}

/// Fake pane driver for testing
#[derive(Clone, Default)]
pub struct FakePaneDriver {
    inner: Arc<Mutex<FakeState>>,
}

impl FakePaneDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.lock().calls.clone()
    }

    /// Get a session's pane by name
    pub fn pane(&self, name: &str) -> Option<FakePane> {
        self.inner.lock().sessions.get(name).cloned()
    }

    /// Add a pre-existing session
    pub fn add_session(&self, name: &str) {
        let mut state = self.inner.lock();
        state.next_pid += 1;
        let pid = 1000 + state.next_pid;
        state
            .sessions
            .insert(name.to_string(), FakePane::new(PathBuf::from("/"), "zsh".into(), pid));
    }

    /// Replace a pane's scrollback lines
    pub fn set_lines(&self, name: &str, lines: &[&str]) {
        if let Some(pane) = self.inner.lock().sessions.get_mut(name) {
            pane.lines = lines.iter().map(|s| s.to_string()).collect();
        }
    }

    /// Set the pane's pending input line (text after the prompt)
    pub fn set_input(&self, name: &str, input: &str) {
        if let Some(pane) = self.inner.lock().sessions.get_mut(name) {
            pane.input = input.to_string();
        }
    }

    /// Queue operator keystrokes to land right after the next literal send
    pub fn queue_typing(&self, name: &str, text: &str) {
        if let Some(pane) = self.inner.lock().sessions.get_mut(name) {
            pane.typing_queue.push_back(text.to_string());
        }
    }

    pub fn set_in_mode(&self, name: &str, in_mode: bool) {
        if let Some(pane) = self.inner.lock().sessions.get_mut(name) {
            pane.in_mode = in_mode;
        }
    }

    pub fn set_dead(&self, name: &str, dead: bool) {
        if let Some(pane) = self.inner.lock().sessions.get_mut(name) {
            pane.dead = dead;
        }
    }

    pub fn set_foreground(&self, name: &str, command: &str) {
        if let Some(pane) = self.inner.lock().sessions.get_mut(name) {
            pane.command = command.to_string();
        }
    }

    /// Make every subsequent `start`/`new_session` fail
    pub fn set_fail_starts(&self, fail: bool) {
        self.inner.lock().fail_starts = fail;
    }

    /// Mark which runtimes count as running inside the pane
    pub fn set_runtimes(&self, name: &str, runtimes: &[&str]) {
        if let Some(pane) = self.inner.lock().sessions.get_mut(name) {
            pane.running_runtimes = runtimes.iter().map(|s| s.to_string()).collect();
        }
    }

    fn with_pane<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut FakePane) -> R,
    ) -> Result<R, TmuxError> {
        let mut state = self.inner.lock();
        match state.sessions.get_mut(name) {
            Some(pane) => Ok(f(pane)),
            None => Err(TmuxError::SessionNotFound(name.to_string())),
        }
    }

    fn record(&self, call: DriverCall) {
        self.inner.lock().calls.push(call);
    }
}

#[async_trait]
impl PaneDriver for FakePaneDriver {
    async fn new_session(&self, name: &str, cwd: &Path) -> Result<(), TmuxError> {
        self.record(DriverCall::NewSession { name: name.to_string(), cwd: cwd.to_path_buf() });
        let mut state = self.inner.lock();
        if state.fail_starts {
            return Err(TmuxError::CommandFailed {
                command: "tmux new-session".to_string(),
                stderr: "scripted failure".to_string(),
            });
        }
        if state.sessions.contains_key(name) {
            return Err(TmuxError::SessionExists(name.to_string()));
        }
        state.next_pid += 1;
        let pid = 1000 + state.next_pid;
        state
            .sessions
            .insert(name.to_string(), FakePane::new(cwd.to_path_buf(), "zsh".into(), pid));
        Ok(())
    }

    async fn start(&self, name: &str, cwd: &Path, command: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::Start {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            command: command.to_string(),
        });
        let mut state = self.inner.lock();
        if state.fail_starts {
            return Err(TmuxError::CommandFailed {
                command: "tmux new-session".to_string(),
                stderr: "scripted failure".to_string(),
            });
        }
        if state.sessions.contains_key(name) {
            return Err(TmuxError::SessionExists(name.to_string()));
        }
        state.next_pid += 1;
        let pid = 1000 + state.next_pid;
        state
            .sessions
            .insert(name.to_string(), FakePane::new(cwd.to_path_buf(), command.to_string(), pid));
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, TmuxError> {
        Ok(self.inner.lock().sessions.contains_key(name))
    }

    async fn stop(&self, name: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::Stop { name: name.to_string() });
        self.inner.lock().sessions.remove(name);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, TmuxError> {
        let mut names: Vec<String> = self.inner.lock().sessions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn send(&self, name: &str, text: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::Send { name: name.to_string(), text: text.to_string() });
        self.with_pane(name, |pane| {
            pane.input.push_str(text);
            let line = format!("> {}", pane.input);
            pane.lines.push(line);
            pane.input.clear();
        })
    }

    async fn send_literal(&self, name: &str, text: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::SendLiteral { name: name.to_string(), text: text.to_string() });
        self.with_pane(name, |pane| {
            pane.input.push_str(text);
            if let Some(typed) = pane.typing_queue.pop_front() {
                pane.input.push_str(&typed);
            }
        })
    }

    async fn send_control(&self, name: &str, key: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::SendControl { name: name.to_string(), key: key.to_string() });
        self.with_pane(name, |pane| match key {
            "C-c" => pane.input.clear(),
            "Enter" => {
                let line = format!("> {}", pane.input);
                pane.lines.push(line);
                pane.input.clear();
            }
            _ => {}
        })
    }

    async fn capture(&self, name: &str, lines: u32) -> Result<String, TmuxError> {
        self.record(DriverCall::Capture { name: name.to_string(), lines });
        self.with_pane(name, |pane| {
            let rendered = pane.render();
            if lines == 0 {
                return rendered;
            }
            let all: Vec<&str> = rendered.lines().collect();
            let start = all.len().saturating_sub(lines as usize);
            all[start..].join("\n")
        })
    }

    async fn capture_all(&self, name: &str) -> Result<String, TmuxError> {
        self.record(DriverCall::CaptureAll { name: name.to_string() });
        self.with_pane(name, |pane| pane.render())
    }

    async fn pane_pid(&self, name: &str) -> Result<u32, TmuxError> {
        self.with_pane(name, |pane| pane.pid)
    }

    async fn pane_command(&self, name: &str) -> Result<String, TmuxError> {
        self.with_pane(name, |pane| pane.command.clone())
    }

    async fn is_pane_dead(&self, name: &str) -> Result<bool, TmuxError> {
        self.with_pane(name, |pane| pane.dead)
    }

    async fn is_pane_in_mode(&self, name: &str) -> Result<bool, TmuxError> {
        self.with_pane(name, |pane| pane.in_mode)
    }

    async fn set_pane_died_hook(&self, name: &str, agent_id: &AgentId) -> Result<(), TmuxError> {
        self.record(DriverCall::SetPaneDiedHook {
            name: name.to_string(),
            agent_id: agent_id.clone(),
        });
        self.with_pane(name, |pane| pane.died_hook = Some(agent_id.clone()))
    }

    async fn is_agent_running(&self, name: &str, runtimes: &[&str]) -> Result<bool, TmuxError> {
        if runtimes.is_empty() {
            return Ok(false);
        }
        let state = self.inner.lock();
        match state.sessions.get(name) {
            Some(pane) => {
                Ok(runtimes.iter().any(|r| pane.running_runtimes.iter().any(|have| have == r)))
            }
            None => Ok(false),
        }
    }

    async fn kill_session_with_processes(&self, name: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::KillWithProcesses { name: name.to_string() });
        self.inner.lock().sessions.remove(name);
        Ok(())
    }

    async fn kill_session_with_processes_excluding(
        &self,
        name: &str,
        exclude: &[u32],
    ) -> Result<(), TmuxError> {
        self.record(DriverCall::KillWithProcessesExcluding {
            name: name.to_string(),
            exclude: exclude.to_vec(),
        });
        self.inner.lock().sessions.remove(name);
        Ok(())
    }

    async fn attach(&self, name: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::Attach { name: name.to_string() });
        if self.inner.lock().sessions.contains_key(name) {
            Ok(())
        } else {
            Err(TmuxError::SessionNotFound(name.to_string()))
        }
    }

    async fn wake(&self, name: &str) -> Result<(), TmuxError> {
        self.record(DriverCall::Wake { name: name.to_string() });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
