// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-tree helpers: parent/group lookups, descendant walks, group kills.
//!
//! Queries run against a [`ProcessSnapshot`] captured once via `ps`, so a
//! whole teardown works from one consistent view of the process table.
//! Signalling uses process groups where the platform has them; on hosts
//! without POSIX process groups the group operations degrade to direct
//! per-PID termination, which may leave double-forked grandchildren alive.

use crate::subprocess::{run_with_timeout, PS_TIMEOUT};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Grace period between SIGTERM and SIGKILL during tree teardown.
pub const KILL_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ProcError {
    #[error("process table snapshot failed: {0}")]
    Snapshot(String),
    #[error("signal delivery failed for pid {pid}: {message}")]
    Signal { pid: u32, message: String },
}

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcEntry {
    pub pid: u32,
    pub ppid: u32,
    pub pgid: u32,
    pub command: String,
}

/// Immutable view of the process table at one instant.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    entries: Vec<ProcEntry>,
}

impl ProcessSnapshot {
    pub fn from_entries(entries: Vec<ProcEntry>) -> Self {
        Self { entries }
    }

    /// Capture the current process table (`ps -eo pid,ppid,pgid,comm`).
    pub async fn capture() -> Result<Self, ProcError> {
        let mut cmd = Command::new("ps");
        cmd.args(["-eo", "pid=,ppid=,pgid=,comm="]);
        let output = run_with_timeout(cmd, PS_TIMEOUT, "ps snapshot")
            .await
            .map_err(ProcError::Snapshot)?;
        if !output.status.success() {
            return Err(ProcError::Snapshot(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(Self::from_entries(parse_ps(&String::from_utf8_lossy(&output.stdout))))
    }

    fn entry(&self, pid: u32) -> Option<&ProcEntry> {
        self.entries.iter().find(|e| e.pid == pid)
    }

    /// Parent PID, if the process is in the snapshot.
    pub fn parent_of(&self, pid: u32) -> Option<u32> {
        self.entry(pid).map(|e| e.ppid)
    }

    /// Process-group id, if the process is in the snapshot.
    pub fn group_of(&self, pid: u32) -> Option<u32> {
        self.entry(pid).map(|e| e.pgid)
    }

    /// Executable name, if the process is in the snapshot.
    pub fn command_of(&self, pid: u32) -> Option<&str> {
        self.entry(pid).map(|e| e.command.as_str())
    }

    /// All processes sharing a group, re-parented survivors included.
    pub fn members_of_group(&self, pgid: u32) -> Vec<u32> {
        self.entries.iter().filter(|e| e.pgid == pgid).map(|e| e.pid).collect()
    }

    /// Transitive children of `pid`, excluding `pid` itself.
    ///
    /// Breadth-first over parent links with a visited set, so the walk
    /// terminates even if PID reuse manufactures a cycle.
    pub fn descendants(&self, pid: u32) -> Vec<u32> {
        let mut visited: HashSet<u32> = HashSet::new();
        visited.insert(pid);
        let mut queue = vec![pid];
        let mut found = Vec::new();
        while let Some(current) = queue.pop() {
            for entry in self.entries.iter().filter(|e| e.ppid == current) {
                if visited.insert(entry.pid) {
                    found.push(entry.pid);
                    queue.push(entry.pid);
                }
            }
        }
        found
    }

    /// Everything that must die when tearing down the tree rooted at `pid`:
    /// the process itself, its descendants, and any group members that
    /// re-parented away.
    pub fn kill_targets(&self, pid: u32) -> Vec<u32> {
        let mut targets = vec![pid];
        targets.extend(self.descendants(pid));
        if let Some(pgid) = self.group_of(pid) {
            for member in self.members_of_group(pgid) {
                if !targets.contains(&member) {
                    targets.push(member);
                }
            }
        }
        targets
    }
}

/// Parse `ps -eo pid=,ppid=,pgid=,comm=` output.
pub(crate) fn parse_ps(output: &str) -> Vec<ProcEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse().ok()?;
            let ppid = parts.next()?.parse().ok()?;
            let pgid = parts.next()?.parse().ok()?;
            let command = parts.collect::<Vec<_>>().join(" ");
            Some(ProcEntry { pid, ppid, pgid, command })
        })
        .collect()
}

#[cfg(unix)]
mod signals {
    use super::ProcError;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    pub fn term_pid(pid: u32) -> Result<(), ProcError> {
        send(pid, Signal::SIGTERM, kill)
    }

    pub fn kill_pid(pid: u32) -> Result<(), ProcError> {
        send(pid, Signal::SIGKILL, kill)
    }

    pub fn term_group(pgid: u32) -> Result<(), ProcError> {
        send(pgid, Signal::SIGTERM, killpg)
    }

    pub fn kill_group(pgid: u32) -> Result<(), ProcError> {
        send(pgid, Signal::SIGKILL, killpg)
    }

    pub fn is_alive(pid: u32) -> bool {
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    fn send(
        pid: u32,
        signal: Signal,
        deliver: fn(Pid, Signal) -> nix::Result<()>,
    ) -> Result<(), ProcError> {
        match deliver(Pid::from_raw(pid as i32), signal) {
            Ok(()) => Ok(()),
            // Already gone is success for teardown purposes.
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(ProcError::Signal { pid, message: e.to_string() }),
        }
    }
}

#[cfg(not(unix))]
mod signals {
    use super::ProcError;

    // Reduced semantics: no process groups, direct terminate only.
    pub fn term_pid(pid: u32) -> Result<(), ProcError> {
        kill_pid(pid)
    }

    pub fn kill_pid(pid: u32) -> Result<(), ProcError> {
        std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status()
            .map(|_| ())
            .map_err(|e| ProcError::Signal { pid, message: e.to_string() })
    }

    pub fn term_group(pgid: u32) -> Result<(), ProcError> {
        term_pid(pgid)
    }

    pub fn kill_group(pgid: u32) -> Result<(), ProcError> {
        kill_pid(pgid)
    }

    pub fn is_alive(_pid: u32) -> bool {
        false
    }
}

pub use signals::is_alive;

/// TERM then, after [`KILL_GRACE`], KILL an entire process group.
pub async fn terminate_group(pgid: u32, grace: Duration) {
    if let Err(e) = signals::term_group(pgid) {
        tracing::debug!(pgid, error = %e, "TERM to group failed");
    }
    tokio::time::sleep(grace).await;
    if let Err(e) = signals::kill_group(pgid) {
        tracing::debug!(pgid, error = %e, "KILL to group failed");
    }
}

/// TERM then KILL each PID individually, skipping `exclude`.
///
/// Used when the caller is itself inside the tree: excluded PIDs are never
/// signalled, not even with TERM.
pub async fn terminate_pids(pids: &[u32], exclude: &[u32], grace: Duration) {
    let targets: Vec<u32> = pids.iter().copied().filter(|p| !exclude.contains(p)).collect();
    for pid in &targets {
        if let Err(e) = signals::term_pid(*pid) {
            tracing::debug!(pid, error = %e, "TERM failed");
        }
    }
    tokio::time::sleep(grace).await;
    for pid in &targets {
        if signals::is_alive(*pid) {
            if let Err(e) = signals::kill_pid(*pid) {
                tracing::debug!(pid, error = %e, "KILL failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "proc_tests.rs"]
mod tests;
