// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes pod source — read-only `Api<Pod>` listing.
//!
//! Agent pods carry a rig membership label (selectable) and an annotation
//! with the full agent id (annotations, unlike label values, may contain
//! slashes). Pods without the annotation are not Gastown's and are
//! skipped.

use super::inventory::{PodSource, PodSourceError};
use async_trait::async_trait;
use gt_core::{AgentId, PodInfo, PodStatus};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;

/// Label selecting a rig's agent pods.
pub const RIG_LABEL: &str = "gastown.dev/rig";

/// Annotation carrying the owning agent id.
pub const AGENT_ID_ANNOTATION: &str = "gastown.dev/agent-id";

/// Read-only pod lister for one rig in one namespace.
pub struct KubePodSource {
    pods: Api<Pod>,
    namespace: String,
    selector: String,
}

impl KubePodSource {
    /// Connect with ambient kube config (in-cluster or `~/.kube/config`).
    pub async fn new(namespace: &str, rig: &str) -> Result<Self, PodSourceError> {
        let client = Client::try_default()
            .await
            .map_err(|e| PodSourceError::List(format!("kube client: {}", e)))?;
        Ok(Self::with_client(client, namespace, rig))
    }

    pub fn with_client(client: Client, namespace: &str, rig: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            selector: format!("{}={}", RIG_LABEL, rig),
        }
    }
}

#[async_trait]
impl PodSource for KubePodSource {
    async fn list(&self) -> Result<Vec<PodInfo>, PodSourceError> {
        let params = ListParams::default().labels(&self.selector);
        let pods = self
            .pods
            .list(&params)
            .await
            .map_err(|e| PodSourceError::List(e.to_string()))?;
        Ok(pods.items.iter().filter_map(|pod| pod_info_from(pod, &self.namespace)).collect())
    }
}

/// Map one pod object to a [`PodInfo`]. `None` when it isn't an agent pod.
pub(crate) fn pod_info_from(pod: &Pod, namespace: &str) -> Option<PodInfo> {
    let agent_id = pod
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(AGENT_ID_ANNOTATION))
        .map(|id| AgentId::new(id.clone()))?;
    let pod_name = pod.metadata.name.clone()?;
    let status = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(PodStatus::from_phase)
        .unwrap_or(PodStatus::Unknown);
    let pod_ip = pod
        .status
        .as_ref()
        .and_then(|s| s.pod_ip.clone())
        .unwrap_or_default();
    Some(PodInfo { agent_id, pod_name, pod_ip, status, namespace: namespace.to_string() })
}

#[cfg(test)]
#[path = "kube_tests.rs"]
mod tests;
