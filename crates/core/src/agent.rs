// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identifier type and the agent → session-name mapping.
//!
//! An AgentId is a stable hierarchical name of the form `rig/role[/name]`
//! (`rig1/polecats/alpha`, `rig1/witness`, `mayor`). The session name it
//! maps to is deterministic and pure: split on `/`, drop the middle role
//! segment when there are three or more segments, prefix with [`SESSION_TAG`]
//! and join with `-`. Bare names additionally resolve against an
//! [`HQ_TAG`]-prefixed candidate so headquarters-level agents can be found.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Tag prefixed to every derived session name.
pub const SESSION_TAG: &str = "gt";

/// Prefix tried for bare agent names (`mayor` → `hq-mayor`).
pub const HQ_TAG: &str = "hq";

/// Stable hierarchical identifier for an agent (`rig/role[/name]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create a new AgentId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this AgentId.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty `/`-separated segments of the identifier.
    pub fn segments(&self) -> Vec<&str> {
        self.0.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// The rig this agent belongs to, when the id carries one.
    pub fn rig(&self) -> Option<&str> {
        let segs = self.segments();
        if segs.len() >= 2 {
            segs.first().copied()
        } else {
            None
        }
    }

    /// The role segment, present only in three-segment ids.
    pub fn role(&self) -> Option<&str> {
        let segs = self.segments();
        if segs.len() >= 3 {
            segs.get(1).copied()
        } else {
            None
        }
    }

    /// The final segment (the agent's own name).
    pub fn name(&self) -> &str {
        self.segments().last().copied().unwrap_or(self.as_str())
    }

    /// True for single-word ids with no hierarchy markers (`mayor`).
    pub fn is_bare(&self) -> bool {
        !self.0.contains('/') && !self.0.contains('-')
    }

    /// Deterministic session name for this agent.
    ///
    /// `rig/role/name` → `gt-rig-name` (role dropped), `rig/name` →
    /// `gt-rig-name`, `name` → `gt-name`. Four or more segments are joined
    /// wholesale.
    pub fn session_name(&self) -> SessionId {
        let joined = match self.segments().as_slice() {
            [] => String::new(),
            [name] => (*name).to_string(),
            [rig, name] => format!("{}-{}", rig, name),
            [rig, _role, name] => format!("{}-{}", rig, name),
            segs => segs.join("-"),
        };
        SessionId::new(format!("{}-{}", SESSION_TAG, joined))
    }

    /// Session names to probe when locating this agent, in order.
    ///
    /// Always starts with [`session_name`](Self::session_name); bare names
    /// also get an `hq-`-prefixed candidate.
    pub fn session_candidates(&self) -> Vec<SessionId> {
        let mut candidates = vec![self.session_name()];
        if self.is_bare() {
            candidates.push(SessionId::new(format!("{}-{}", HQ_TAG, self.0)));
        }
        candidates
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
