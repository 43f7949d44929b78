// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::tmux::{DriverCall, FakePaneDriver};

fn backend() -> (LocalBackend<FakePaneDriver>, FakePaneDriver) {
    let driver = FakePaneDriver::new();
    driver.add_session("gt-rig1-alpha");
    (LocalBackend::with_nudge_timing(driver.clone(), NudgeTiming::instant()), driver)
}

#[tokio::test]
async fn kill_session_then_has_session_is_false() {
    let (backend, _driver) = backend();
    assert!(backend.has_session("gt-rig1-alpha").await.unwrap());
    backend.kill_session("gt-rig1-alpha").await.unwrap();
    assert!(!backend.has_session("gt-rig1-alpha").await.unwrap());
}

#[tokio::test]
async fn kill_goes_through_process_teardown() {
    let (backend, driver) = backend();
    backend.kill_session("gt-rig1-alpha").await.unwrap();
    assert!(driver
        .calls()
        .iter()
        .any(|c| matches!(c, DriverCall::KillWithProcesses { name } if name == "gt-rig1-alpha")));
}

#[tokio::test]
async fn send_keys_splits_on_whitespace() {
    let (backend, driver) = backend();
    backend.send_keys("gt-rig1-alpha", "Escape Down Enter").await.unwrap();
    let keys: Vec<String> = driver
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            DriverCall::SendControl { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec!["Escape", "Down", "Enter"]);
}

#[tokio::test]
async fn nudge_submits_message() {
    let (backend, driver) = backend();
    backend.nudge_session("gt-rig1-alpha", "status report please").await.unwrap();
    let pane = driver.pane("gt-rig1-alpha").unwrap();
    assert_eq!(pane.lines.last().map(String::as_str), Some("> status report please"));
}

#[tokio::test]
async fn coop_only_operations_are_not_supported() {
    let (backend, _driver) = backend();
    let session = "gt-rig1-alpha";

    assert!(backend.is_agent_running(session).await.unwrap_err().is_not_supported());
    assert!(backend.agent_state(session).await.unwrap_err().is_not_supported());
    assert!(backend.pane_work_dir(session).await.unwrap_err().is_not_supported());
    assert!(backend.get_environment(session, "K").await.unwrap_err().is_not_supported());
    assert!(backend.set_environment(session, "K", "V").await.unwrap_err().is_not_supported());
    assert!(backend.send_input(session, "x", true).await.unwrap_err().is_not_supported());
    assert!(backend.respawn_pane(session).await.unwrap_err().is_not_supported());
    assert!(backend
        .switch_session(session, &HashMap::new())
        .await
        .unwrap_err()
        .is_not_supported());
    assert!(backend
        .respond_to_prompt(session, &PromptResponse::accept())
        .await
        .unwrap_err()
        .is_not_supported());
}
