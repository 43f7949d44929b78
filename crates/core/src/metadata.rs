// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger metadata records and their `key: value` line format.
//!
//! The external ledger owns agent metadata; this module only parses it.
//! Parsing tolerates blank lines, surrounding whitespace, and unknown keys,
//! and splits on the first colon only so values may themselves contain
//! colons (URLs in particular).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Well-known metadata keys.
pub mod keys {
    pub const BACKEND: &str = "backend";
    pub const COOP_URL: &str = "coop_url";
    pub const COOP_TOKEN: &str = "coop_token";
    pub const SSH_HOST: &str = "ssh_host";
    pub const SSH_PORT: &str = "ssh_port";
    pub const SSH_KEY: &str = "ssh_key";
    pub const POD_NAME: &str = "pod_name";
    pub const POD_NAMESPACE: &str = "pod_namespace";
}

/// Which backend family serves an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Coop,
    K8s,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendKind::Local => "local",
            BackendKind::Coop => "coop",
            BackendKind::K8s => "k8s",
        };
        write!(f, "{}", s)
    }
}

/// Parse `key: value` lines into a flat map.
///
/// Lines without a colon are skipped. Later duplicates win.
pub fn parse_metadata(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            map.insert(key.to_string(), value.trim().to_string());
        }
    }
    map
}

/// Decide the backend family from a metadata map.
///
/// Coop wins over k8s; anything incomplete or unrecognized falls back to
/// local. A coop record needs the tag and a URL; a k8s record needs the tag
/// and at least a host.
pub fn classify_backend(meta: &HashMap<String, String>) -> BackendKind {
    match meta.get(keys::BACKEND).map(String::as_str) {
        Some("coop") if meta.get(keys::COOP_URL).is_some_and(|u| !u.is_empty()) => {
            BackendKind::Coop
        }
        Some("k8s") if meta.get(keys::SSH_HOST).is_some_and(|h| !h.is_empty()) => BackendKind::K8s,
        _ => BackendKind::Local,
    }
}

/// Connection record for a coop-served agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoopConfig {
    pub url: String,
    pub token: Option<String>,
}

impl CoopConfig {
    /// Extract a coop record from parsed metadata. `None` unless the record
    /// is complete (`backend: coop` plus a non-empty URL).
    pub fn from_metadata(meta: &HashMap<String, String>) -> Option<Self> {
        if classify_backend(meta) != BackendKind::Coop {
            return None;
        }
        let url = meta.get(keys::COOP_URL)?;
        Some(Self {
            url: url.trim_end_matches('/').to_string(),
            token: meta.get(keys::COOP_TOKEN).filter(|t| !t.is_empty()).cloned(),
        })
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::from_metadata(&parse_metadata(text))
    }

    /// Serialize back to the ledger line format. Re-parsing the output
    /// yields an equal record.
    pub fn to_metadata(&self) -> String {
        let mut out = format!("{}: coop\n{}: {}\n", keys::BACKEND, keys::COOP_URL, self.url);
        if let Some(token) = &self.token {
            out.push_str(&format!("{}: {}\n", keys::COOP_TOKEN, token));
        }
        out
    }
}

/// Connection record for a k8s-hosted agent reached over an SSH-style pipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    pub host: String,
    pub port: Option<u16>,
    pub key: Option<String>,
    pub pod_name: Option<String>,
    pub pod_namespace: Option<String>,
}

impl SshConfig {
    /// Extract a k8s record from parsed metadata. `None` unless the record
    /// is complete (`backend: k8s` plus a non-empty host).
    pub fn from_metadata(meta: &HashMap<String, String>) -> Option<Self> {
        if classify_backend(meta) != BackendKind::K8s {
            return None;
        }
        let host = meta.get(keys::SSH_HOST)?;
        Some(Self {
            host: host.clone(),
            port: meta.get(keys::SSH_PORT).and_then(|p| p.parse().ok()),
            key: meta.get(keys::SSH_KEY).filter(|k| !k.is_empty()).cloned(),
            pod_name: meta.get(keys::POD_NAME).filter(|p| !p.is_empty()).cloned(),
            pod_namespace: meta.get(keys::POD_NAMESPACE).filter(|n| !n.is_empty()).cloned(),
        })
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::from_metadata(&parse_metadata(text))
    }

    /// Serialize back to the ledger line format. Re-parsing the output
    /// yields an equal record.
    pub fn to_metadata(&self) -> String {
        let mut out = format!("{}: k8s\n{}: {}\n", keys::BACKEND, keys::SSH_HOST, self.host);
        if let Some(port) = self.port {
            out.push_str(&format!("{}: {}\n", keys::SSH_PORT, port));
        }
        if let Some(key) = &self.key {
            out.push_str(&format!("{}: {}\n", keys::SSH_KEY, key));
        }
        if let Some(pod) = &self.pod_name {
            out.push_str(&format!("{}: {}\n", keys::POD_NAME, pod));
        }
        if let Some(ns) = &self.pod_namespace {
            out.push_str(&format!("{}: {}\n", keys::POD_NAMESPACE, ns));
        }
        out
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
