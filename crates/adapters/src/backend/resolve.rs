// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend resolution: agent id → the backend that can reach it.
//!
//! The external ledger owns agent metadata; the resolver only reads it.
//! Resolution order is coop, then k8s, then the local fallback — missing
//! or incomplete metadata always lands on local. Bare names retry the
//! lookup under an `hq-` prefix so headquarters agents resolve.

use super::{Backend, CoopBackend, LocalBackend, PodPipeBackend};
use crate::tmux::PaneDriver;
use async_trait::async_trait;
use gt_core::metadata::{classify_backend, BackendKind, CoopConfig};
use gt_core::{AgentId, SessionId, HQ_TAG};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of the ledger's agent metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Flat key/value metadata for an agent, if the ledger knows it.
    async fn metadata(&self, agent_id: &AgentId) -> Option<HashMap<String, String>>;
}

/// A resolved backend plus the session name to address it with.
#[derive(Clone)]
pub struct ResolvedBackend {
    pub backend: Arc<dyn Backend>,
    pub session: SessionId,
    pub kind: BackendKind,
}

/// Resolves agents to backends using ledger metadata.
pub struct BackendResolver<M, D> {
    source: M,
    driver: D,
    coop: CoopBackend,
}

impl<M: MetadataSource, D: PaneDriver> BackendResolver<M, D> {
    pub fn new(source: M, driver: D) -> Self {
        Self { source, driver, coop: CoopBackend::new() }
    }

    /// The shared coop backend all coop-resolved sessions register into.
    pub fn coop(&self) -> &CoopBackend {
        &self.coop
    }

    pub async fn resolve(&self, agent_id: &AgentId) -> ResolvedBackend {
        let meta = self.lookup(agent_id).await.unwrap_or_default();
        let kind = classify_backend(&meta);
        match kind {
            BackendKind::Coop => {
                let session = agent_id.session_name();
                if let Some(config) = CoopConfig::from_metadata(&meta) {
                    self.coop.add_session(session.as_str(), &config.url, config.token);
                }
                tracing::debug!(%agent_id, %session, "resolved to coop backend");
                ResolvedBackend { backend: Arc::new(self.coop.clone()), session, kind }
            }
            BackendKind::K8s => {
                let session = agent_id.session_name();
                tracing::debug!(%agent_id, %session, "resolved to pod-pipe backend");
                ResolvedBackend {
                    backend: Arc::new(PodPipeBackend::new(self.driver.clone())),
                    session,
                    kind,
                }
            }
            BackendKind::Local => {
                let session = self.pick_local_session(agent_id).await;
                tracing::debug!(%agent_id, %session, "resolved to local backend");
                ResolvedBackend {
                    backend: Arc::new(LocalBackend::new(self.driver.clone())),
                    session,
                    kind,
                }
            }
        }
    }

    async fn lookup(&self, agent_id: &AgentId) -> Option<HashMap<String, String>> {
        if let Some(meta) = self.source.metadata(agent_id).await {
            if !meta.is_empty() {
                return Some(meta);
            }
        }
        if agent_id.is_bare() {
            let hq = AgentId::new(format!("{}-{}", HQ_TAG, agent_id));
            return self.source.metadata(&hq).await;
        }
        None
    }

    /// First existing session among the candidates, else the primary name.
    async fn pick_local_session(&self, agent_id: &AgentId) -> SessionId {
        let candidates = agent_id.session_candidates();
        for candidate in &candidates {
            if self.driver.exists(candidate.as_str()).await.unwrap_or(false) {
                return candidate.clone();
            }
        }
        agent_id.session_name()
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
