// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend resolution scenarios, ledger metadata through to live backends.

use async_trait::async_trait;
use gt_adapters::backend::{Backend, BackendResolver, MetadataSource};
use gt_adapters::tmux::FakePaneDriver;
use gt_core::{parse_metadata, AgentId, BackendKind, CoopConfig, SshConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Default)]
struct Ledger {
    records: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl MetadataSource for Ledger {
    async fn metadata(&self, agent_id: &AgentId) -> Option<HashMap<String, String>> {
        self.records.lock().get(agent_id.as_str()).map(|text| parse_metadata(text))
    }
}

#[tokio::test]
async fn coop_resolution_reaches_the_sidecar() {
    // Canned coop sidecar: health says running.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 2048];
        let _ = socket.read(&mut buf).await;
        let body = r#"{"status":"running","pid":4242,"ready":true}"#;
        let response =
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
        socket.write_all(response.as_bytes()).await.unwrap();
    });

    let ledger = Ledger::default();
    ledger.records.lock().insert(
        "rig1/polecats/alpha".to_string(),
        format!("backend: coop\ncoop_url: http://{}/", addr),
    );

    let resolver = BackendResolver::new(ledger, FakePaneDriver::new());
    let resolved = resolver.resolve(&AgentId::new("rig1/polecats/alpha")).await;

    assert_eq!(resolved.kind, BackendKind::Coop);
    assert_eq!(resolved.session, "gt-rig1-alpha");
    assert!(resolved.backend.has_session(resolved.session.as_str()).await.unwrap());
}

#[tokio::test]
async fn unreachable_coop_reads_as_not_running() {
    let ledger = Ledger::default();
    ledger.records.lock().insert(
        "rig1/polecats/alpha".to_string(),
        "backend: coop\ncoop_url: http://127.0.0.1:1".to_string(),
    );
    let resolver = BackendResolver::new(ledger, FakePaneDriver::new());
    let resolved = resolver.resolve(&AgentId::new("rig1/polecats/alpha")).await;
    // Unreachable is an observation, not an error.
    assert!(!resolved.backend.has_session(resolved.session.as_str()).await.unwrap());
}

#[tokio::test]
async fn k8s_and_local_resolution_pick_expected_backends() {
    let ledger = Ledger::default();
    ledger.records.lock().insert(
        "rig1/polecats/alpha".to_string(),
        "backend: k8s\nssh_host: 10.9.9.9\npod_name: pod-1\npod_namespace: gastown".to_string(),
    );
    let resolver = BackendResolver::new(ledger, FakePaneDriver::new());

    let resolved = resolver.resolve(&AgentId::new("rig1/polecats/alpha")).await;
    assert_eq!(resolved.kind, BackendKind::K8s);

    let resolved = resolver.resolve(&AgentId::new("rig1/witness")).await;
    assert_eq!(resolved.kind, BackendKind::Local);
}

#[test]
fn ledger_records_roundtrip_through_their_serialization() {
    let coop = CoopConfig { url: "http://10.0.0.4:8080".into(), token: Some("tok".into()) };
    assert_eq!(CoopConfig::parse(&coop.to_metadata()), Some(coop));

    let ssh = SshConfig {
        host: "10.9.9.9".into(),
        port: Some(22),
        key: None,
        pod_name: Some("pod-1".into()),
        pod_namespace: Some("gastown".into()),
    };
    assert_eq!(SshConfig::parse(&ssh.to_metadata()), Some(ssh));
}
