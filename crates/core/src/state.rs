// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent state events and prompt types carried over the coop stream.
//!
//! The coop sidecar pushes line-delimited JSON frames over its WebSocket.
//! Frames with `event ∈ {transition, exit}` become [`AgentStateEvent`]s;
//! everything else is dropped by the watcher. `seq` is monotonic per stream
//! and consumers tolerate gaps but never reordering.

use serde::{Deserialize, Serialize};

/// A state change observed on an agent's coop stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStateEvent {
    /// The agent moved between states (`working` → `idle`, …).
    Transition { prev: String, next: String, seq: u64, prompt: Option<PromptInfo> },
    /// The agent process exited. Terminal for the stream.
    Exit { code: Option<i32> },
}

impl AgentStateEvent {
    /// Stream sequence number, when the event carries one.
    pub fn seq(&self) -> Option<u64> {
        match self {
            AgentStateEvent::Transition { seq, .. } => Some(*seq),
            AgentStateEvent::Exit { .. } => None,
        }
    }
}

/// Prompt the agent is blocked on, attached to `prompt`-state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInfo {
    /// Prompt category as reported by coop (`permission`, `plan`, `question`).
    #[serde(rename = "type")]
    pub kind: String,
    pub message: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Snapshot of an agent's current state from `GET /api/v1/agent/state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent: String,
    pub state: String,
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub prompt: Option<PromptInfo>,
}

impl AgentSnapshot {
    pub fn is_running(&self) -> bool {
        self.state == "running" || self.state == "working"
    }
}

/// Answer to a pending agent prompt, delivered via `POST /api/v1/agent/respond`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl PromptResponse {
    pub fn accept() -> Self {
        Self { accept: Some(true), ..Self::default() }
    }

    pub fn reject() -> Self {
        Self { accept: Some(false), ..Self::default() }
    }

    pub fn option(option: impl Into<String>) -> Self {
        Self { option: Some(option.into()), ..Self::default() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
