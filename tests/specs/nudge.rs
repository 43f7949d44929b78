// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nudge delivery scenarios through the Backend surface.

use gt_adapters::backend::{Backend, BackendError, LocalBackend};
use gt_adapters::nudge::{NudgeError, NudgeTiming};
use gt_adapters::tmux::FakePaneDriver;
use std::sync::Arc;

const SESSION: &str = "gt-rig1-alpha";

fn backend_with_pane() -> (Arc<dyn Backend>, FakePaneDriver) {
    let driver = FakePaneDriver::new();
    driver.add_session(SESSION);
    driver.set_lines(SESSION, &["claude 2.1.14", "────────", "ready"]);
    let backend = LocalBackend::with_nudge_timing(driver.clone(), NudgeTiming::instant());
    (Arc::new(backend), driver)
}

#[tokio::test]
async fn happy_nudge_lands_on_quiet_prompt() {
    let (backend, driver) = backend_with_pane();

    backend.nudge_session(SESSION, "hello").await.unwrap();

    let pane = driver.pane(SESSION).unwrap();
    assert_eq!(pane.lines.last().map(String::as_str), Some("> hello"));
    assert_eq!(pane.input, "", "no stray restore input after a clean nudge");
}

#[tokio::test]
async fn nudge_during_typing_preserves_keystrokes() {
    let (backend, driver) = backend_with_pane();
    driver.set_input(SESSION, "ab");
    driver.queue_typing(SESSION, "cd");

    backend.nudge_session(SESSION, "hello").await.unwrap();

    let pane = driver.pane(SESSION).unwrap();
    assert!(pane.lines.iter().any(|l| l == "> hello"), "message submitted");
    assert_eq!(pane.input, "abcd", "operator input restored in order");
}

#[tokio::test]
async fn paste_placeholder_blocks_delivery() {
    let (backend, driver) = backend_with_pane();
    driver.set_lines(SESSION, &["output", "[Pasted text #3 +47 lines]"]);

    let err = backend.nudge_session(SESSION, "hello").await.unwrap_err();
    match err {
        BackendError::Nudge(NudgeError::PastePlaceholder) => {}
        other => panic!("unexpected: {other:?}"),
    }
    // Nothing was typed into the pane.
    assert_eq!(driver.pane(SESSION).unwrap().input, "");
}

#[tokio::test]
async fn kill_session_then_has_session_is_false() {
    let (backend, _driver) = backend_with_pane();
    assert!(backend.has_session(SESSION).await.unwrap());
    backend.kill_session(SESSION).await.unwrap();
    assert!(!backend.has_session(SESSION).await.unwrap());
}
