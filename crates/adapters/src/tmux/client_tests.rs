// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::tmux::PaneDriver;
use serial_test::serial;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

/// Random prefix for this test run to avoid conflicts with parallel test runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("gt-t{:04x}", nanos & 0xFFFF)
});

/// Counter for generating unique session names across parallel tests.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

/// Check if tmux is available on this system
fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! fail_if_no_tmux {
    () => {
        if !tmux_available() {
            panic!("tmux is required but not available");
        }
    };
}

#[tokio::test]
#[serial(tmux)]
async fn new_session_then_exists_then_stop() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("lifecycle");

    let cwd = tempfile::tempdir().unwrap();
    client.new_session(&name, cwd.path()).await.unwrap();
    assert!(client.exists(&name).await.unwrap());

    client.stop(&name).await.unwrap();
    assert!(!client.exists(&name).await.unwrap());
    // Idempotent: stopping again is still success.
    client.stop(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn new_session_rejects_missing_cwd() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("nocwd");
    let err =
        client.new_session(&name, Path::new("/definitely/not/a/dir")).await.unwrap_err();
    assert!(matches!(err, TmuxError::CommandFailed { .. }), "got: {err:?}");
}

#[tokio::test]
#[serial(tmux)]
async fn new_session_rejects_duplicate() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("dup");

    client.new_session(&name, Path::new("/tmp")).await.unwrap();
    let err = client.new_session(&name, Path::new("/tmp")).await.unwrap_err();
    assert!(matches!(err, TmuxError::SessionExists(_)), "got: {err:?}");

    client.stop(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn exists_is_exact_never_prefix() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("exact");

    client.new_session(&name, Path::new("/tmp")).await.unwrap();
    let prefix = &name[..name.len() - 1];
    assert!(!client.exists(prefix).await.unwrap(), "prefix must not match");

    client.stop(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn send_and_capture_roundtrip() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("send");

    client.new_session(&name, Path::new("/tmp")).await.unwrap();
    client.send(&name, "echo gt-marker-$((40 + 2))").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let captured = client.capture(&name, 20).await.unwrap();
    assert!(captured.contains("gt-marker-42"), "captured: {captured}");

    client.stop(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn start_keeps_dead_pane_inspectable() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("dead");

    client.start(&name, Path::new("/tmp"), "echo crash-output; exit 3").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(client.exists(&name).await.unwrap(), "remain-on-exit must keep the session");
    assert!(client.is_pane_dead(&name).await.unwrap());
    let captured = client.capture(&name, 20).await.unwrap();
    assert!(captured.contains("crash-output"), "captured: {captured}");

    client.kill_session_with_processes(&name).await.unwrap();
    assert!(!client.exists(&name).await.unwrap());
}

#[tokio::test]
#[serial(tmux)]
async fn pane_introspection_reports_shell() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("intro");

    client.new_session(&name, Path::new("/tmp")).await.unwrap();
    let pid = client.pane_pid(&name).await.unwrap();
    assert!(pid > 1);
    assert!(!client.is_pane_dead(&name).await.unwrap());
    assert!(!client.is_pane_in_mode(&name).await.unwrap());

    client.stop(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn kill_with_processes_takes_descendants_down() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("tree");

    client.start(&name, Path::new("/tmp"), "sh -c 'sleep 300 & sleep 300'").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let pid = client.pane_pid(&name).await.unwrap();

    let snapshot = crate::proc::ProcessSnapshot::capture().await.unwrap();
    let kids = snapshot.descendants(pid);

    client.kill_session_with_processes(&name).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!client.exists(&name).await.unwrap());
    for kid in kids {
        assert!(!crate::proc::is_alive(kid), "descendant {kid} survived");
    }
}

#[tokio::test]
#[serial(tmux)]
async fn is_agent_running_false_for_missing_session_and_empty_names() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    assert!(!client.is_agent_running("gt-no-such-session", &["claude"]).await.unwrap());

    let name = unique_name("run");
    client.new_session(&name, Path::new("/tmp")).await.unwrap();
    assert!(!client.is_agent_running(&name, &[]).await.unwrap());

    client.stop(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn is_agent_running_sees_descendant_process() {
    fail_if_no_tmux!();
    let client = TmuxClient::new();
    let name = unique_name("detect");

    client.new_session(&name, Path::new("/tmp")).await.unwrap();
    client.send(&name, "sleep 300").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(client.is_agent_running(&name, &["sleep"]).await.unwrap());
    assert!(!client.is_agent_running(&name, &["claude"]).await.unwrap());

    client.kill_session_with_processes(&name).await.unwrap();
}
