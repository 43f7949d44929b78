// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[yare::parameterized(
    running = { r#"{"status":"running","pid":1234,"ready":true}"#, true },
    null_pid = { r#"{"status":"running","pid":null}"#, false },
    stopped = { r#"{"status":"stopped","pid":1234}"#, false },
    missing_pid = { r#"{"status":"running"}"#, false },
    garbage = { "nope", false },
)]
fn health_parsing(body: &str, expected: bool) {
    assert_eq!(health_means_running(body), expected);
}

#[test]
fn add_session_strips_trailing_slashes() {
    let backend = CoopBackend::new();
    backend.add_session("gt-rig1-alpha", "http://10.0.0.4:8080///", None);
    let (url, token) = backend.session_endpoint("gt-rig1-alpha").unwrap();
    assert_eq!(url, "http://10.0.0.4:8080");
    assert_eq!(token, None);
}

#[tokio::test]
async fn operations_on_unregistered_session_fail_typed() {
    let backend = CoopBackend::new();
    let err = backend.capture("gt-ghost", 10).await.unwrap_err();
    assert!(matches!(err, BackendError::UnknownSession(name) if name == "gt-ghost"));
}

#[tokio::test]
async fn has_session_false_for_unregistered_and_unreachable() {
    let backend = CoopBackend::new();
    // Unregistered: no session, not an error.
    assert!(!backend.has_session("gt-ghost").await.unwrap());

    // Registered but unreachable: still just "not running".
    backend.add_session("gt-rig1-alpha", "http://127.0.0.1:1", None);
    assert!(!backend.has_session("gt-rig1-alpha").await.unwrap());
}

/// Serve one canned HTTP response on an ephemeral port, capturing the
/// request for assertions.
async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    });
    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn has_session_true_for_running_sidecar() {
    let body = r#"{"status":"running","pid":1234,"ready":true}"#;
    let (url, server) = one_shot_server(
        "HTTP/1.1 200 OK\r\nContent-Length: 44\r\n\r\n{\"status\":\"running\",\"pid\":1234,\"ready\":true}",
    )
    .await;
    assert_eq!(body.len(), 44);

    let backend = CoopBackend::new();
    backend.add_session("gt-rig1-alpha", &url, Some("s3cret".into()));
    assert!(backend.has_session("gt-rig1-alpha").await.unwrap());

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/v1/health HTTP/1.1"), "request: {request}");
    assert!(request.contains("Authorization: Bearer s3cret"), "request: {request}");
}

#[tokio::test]
async fn nudge_rejection_carries_reason() {
    let (url, server) = one_shot_server(
        "HTTP/1.1 200 OK\r\nContent-Length: 40\r\n\r\n{\"delivered\":false,\"reason\":\"pane busy\"}",
    )
    .await;

    let backend = CoopBackend::new();
    backend.add_session("s", &url, None);
    let err = backend.nudge_session("s", "hello").await.unwrap_err();
    assert!(matches!(err, BackendError::NudgeRejected(reason) if reason == "pane busy"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/v1/agent/nudge"), "request: {request}");
    assert!(request.contains(r#"{"message":"hello"}"#), "request: {request}");
}

#[tokio::test]
async fn capture_trims_to_requested_tail() {
    let (url, _server) = one_shot_server(
        "HTTP/1.1 200 OK\r\nContent-Length: 18\r\n\r\none\ntwo\nthree\nfour",
    )
    .await;

    let backend = CoopBackend::new();
    backend.add_session("s", &url, None);
    let captured = backend.capture("s", 2).await.unwrap();
    assert_eq!(captured, "three\nfour");
}

#[tokio::test]
async fn get_environment_maps_404_to_not_found() {
    let (url, _server) =
        one_shot_server("HTTP/1.1 404 Not Found\r\nContent-Length: 2\r\n\r\n{}").await;

    let backend = CoopBackend::new();
    backend.add_session("s", &url, None);
    let err = backend.get_environment("s", "RIG").await.unwrap_err();
    assert!(matches!(err, BackendError::EnvNotFound(key) if key == "RIG"));
}

#[tokio::test]
async fn transport_error_for_server_failure() {
    let (url, _server) =
        one_shot_server("HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\n\r\nboom!")
            .await;

    let backend = CoopBackend::new();
    backend.add_session("s", &url, None);
    let err = backend.capture("s", 0).await.unwrap_err();
    match err {
        BackendError::Transport { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom!");
        }
        other => panic!("unexpected: {other:?}"),
    }
}
