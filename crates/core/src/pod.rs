// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod inventory records and the change events derived from them.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of an agent pod. Only `Running` pods are eligible for a
/// pipe connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Terminated,
    Unknown,
}

impl PodStatus {
    /// Map a Kubernetes pod phase string to a status.
    pub fn from_phase(phase: &str) -> Self {
        match phase.to_ascii_lowercase().as_str() {
            "pending" => PodStatus::Pending,
            "running" => PodStatus::Running,
            "succeeded" => PodStatus::Succeeded,
            "failed" => PodStatus::Failed,
            "terminating" | "terminated" => PodStatus::Terminated,
            _ => PodStatus::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, PodStatus::Running)
    }
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodStatus::Pending => "pending",
            PodStatus::Running => "running",
            PodStatus::Succeeded => "succeeded",
            PodStatus::Failed => "failed",
            PodStatus::Terminated => "terminated",
            PodStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One pod as seen by a discovery source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    pub agent_id: AgentId,
    pub pod_name: String,
    pub pod_ip: String,
    pub status: PodStatus,
    pub namespace: String,
}

impl PodInfo {
    /// True when the pod identity changed in a way that invalidates an
    /// existing pipe (name or IP moved).
    pub fn identity_changed(&self, other: &PodInfo) -> bool {
        self.pod_name != other.pod_name || self.pod_ip != other.pod_ip
    }
}

/// Kind of change the inventory observed for an agent's pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodEventKind {
    Added,
    Updated,
    Removed,
}

/// A change event emitted by the pod inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodEvent {
    pub kind: PodEventKind,
    pub pod: PodInfo,
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod tests;
