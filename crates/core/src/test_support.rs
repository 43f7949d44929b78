// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture builders shared by other crates' tests.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::agent::AgentId;
use crate::pod::{PodInfo, PodStatus};

/// Builder for [`PodInfo`] fixtures.
#[derive(Debug, Clone)]
pub struct PodInfoBuilder {
    agent_id: AgentId,
    pod_name: String,
    pod_ip: String,
    status: PodStatus,
    namespace: String,
}

impl PodInfoBuilder {
    pub fn new(agent_id: impl Into<String>) -> Self {
        let agent_id = AgentId::new(agent_id);
        let pod_name = format!("pod-{}", agent_id.name());
        Self {
            agent_id,
            pod_name,
            pod_ip: "10.0.0.1".to_string(),
            status: PodStatus::Running,
            namespace: "gastown".to_string(),
        }
    }

    pub fn pod_name(mut self, name: impl Into<String>) -> Self {
        self.pod_name = name.into();
        self
    }

    pub fn pod_ip(mut self, ip: impl Into<String>) -> Self {
        self.pod_ip = ip.into();
        self
    }

    pub fn status(mut self, status: PodStatus) -> Self {
        self.status = status;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn build(self) -> PodInfo {
        PodInfo {
            agent_id: self.agent_id,
            pod_name: self.pod_name,
            pod_ip: self.pod_ip,
            status: self.status,
            namespace: self.namespace,
        }
    }
}

impl PodInfo {
    /// Start building a pod fixture for `agent_id`.
    pub fn builder(agent_id: impl Into<String>) -> PodInfoBuilder {
        PodInfoBuilder::new(agent_id)
    }
}
