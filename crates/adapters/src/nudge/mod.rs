// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reliable message injection into a live input line.
//!
//! A nudge must land on the agent's prompt even while the operator is
//! typing, without losing their keystrokes. The protocol per attempt:
//! capture BEFORE, clear the line (`C-c`), inject the message as literal
//! keystrokes, capture AFTER, and verify the message sits alone on the
//! input line. Stray text around it means the operator was typing — the
//! strays are preserved, the protocol waits for a typing lull, and retries.
//! On every terminal outcome the operator's input (original line plus
//! strays) is re-sent without Enter.

pub mod verify;

use crate::tmux::{PaneDriver, TmuxError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 2;
/// AFTER-capture tail inspected for the injected message.
pub const TAIL_LINES: u32 = 30;
/// Scrollback tail scanned for a paste placeholder before injecting.
pub const PASTE_SCAN_LINES: u32 = 50;
/// Lines of context used to locate the original input in BEFORE.
pub const CONTEXT_LINES: usize = 3;
/// Tail compared between samples when waiting for a typing lull.
pub const LULL_TAIL_LINES: u32 = 5;
/// Settle time after clearing the input line.
pub const CLEAR_SETTLE: Duration = Duration::from_millis(50);
/// Settle time after injecting the message.
pub const INJECT_SETTLE: Duration = Duration::from_millis(50);
/// Quiet period that counts as a typing lull.
pub const LULL_WINDOW: Duration = Duration::from_millis(300);
/// Sampling interval while waiting for the lull.
pub const LULL_POLL: Duration = Duration::from_millis(50);
/// Upper bound on lull waiting per retry.
pub const LULL_MAX_WAIT: Duration = Duration::from_secs(3);

/// Nudge-protocol outcomes the caller decides how to handle.
#[derive(Debug, Error)]
pub enum NudgeError {
    /// Pane is in copy/search/scroll mode; transient, retry later.
    #[error("pane is in an interactive mode")]
    PaneInMode,
    /// A paste placeholder is on screen; injecting would corrupt it.
    #[error("paste placeholder present, unsafe to inject")]
    PastePlaceholder,
    /// The injected message never appeared in the pane.
    #[error("injected message not found in pane")]
    NotFound,
    /// The operator kept typing through every retry.
    #[error("gave up after {attempts} attempts")]
    MaxRetries { attempts: u32 },
    #[error(transparent)]
    Tmux(#[from] TmuxError),
}

/// Operator input preserved across an injection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedInput {
    /// Input line recovered from the BEFORE capture.
    pub original: String,
    /// Stray text found before the message during verification.
    pub extra_before: String,
    /// Stray text found after the message during verification.
    pub extra_after: String,
}

impl PreservedInput {
    /// Everything to re-send, in order.
    pub fn combined(&self) -> String {
        format!("{}{}{}", self.original, self.extra_before, self.extra_after)
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty() && self.extra_before.is_empty() && self.extra_after.is_empty()
    }
}

/// Successful delivery report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NudgeReceipt {
    /// Attempts used, first try included.
    pub attempts: u32,
    /// Operator input restored after the send.
    pub preserved: PreservedInput,
}

/// Minimal pane surface the protocol needs, so the same state machine runs
/// against tmux panes, pod pipes, and fakes.
#[async_trait]
pub trait NudgeTarget: Send + Sync {
    async fn capture_tail(&self, lines: u32) -> Result<String, TmuxError>;
    async fn capture_all(&self) -> Result<String, TmuxError>;
    async fn send_literal(&self, text: &str) -> Result<(), TmuxError>;
    async fn send_key(&self, key: &str) -> Result<(), TmuxError>;
    async fn is_in_mode(&self) -> Result<bool, TmuxError>;
    async fn wake_if_detached(&self) -> Result<(), TmuxError>;
}

/// [`NudgeTarget`] over one pane-driver session.
pub struct PaneTarget<'a, D: PaneDriver> {
    driver: &'a D,
    session: &'a str,
}

impl<'a, D: PaneDriver> PaneTarget<'a, D> {
    pub fn new(driver: &'a D, session: &'a str) -> Self {
        Self { driver, session }
    }
}

#[async_trait]
impl<D: PaneDriver> NudgeTarget for PaneTarget<'_, D> {
    async fn capture_tail(&self, lines: u32) -> Result<String, TmuxError> {
        self.driver.capture(self.session, lines).await
    }

    async fn capture_all(&self) -> Result<String, TmuxError> {
        self.driver.capture_all(self.session).await
    }

    async fn send_literal(&self, text: &str) -> Result<(), TmuxError> {
        self.driver.send_literal(self.session, text).await
    }

    async fn send_key(&self, key: &str) -> Result<(), TmuxError> {
        self.driver.send_control(self.session, key).await
    }

    async fn is_in_mode(&self) -> Result<bool, TmuxError> {
        self.driver.is_pane_in_mode(self.session).await
    }

    async fn wake_if_detached(&self) -> Result<(), TmuxError> {
        self.driver.wake(self.session).await
    }
}

/// Protocol timings, injectable so tests run without wall-clock waits.
#[derive(Debug, Clone, Copy)]
pub struct NudgeTiming {
    pub clear_settle: Duration,
    pub inject_settle: Duration,
    pub lull_window: Duration,
    pub lull_poll: Duration,
    pub lull_max_wait: Duration,
}

impl Default for NudgeTiming {
    fn default() -> Self {
        Self {
            clear_settle: CLEAR_SETTLE,
            inject_settle: INJECT_SETTLE,
            lull_window: LULL_WINDOW,
            lull_poll: LULL_POLL,
            lull_max_wait: LULL_MAX_WAIT,
        }
    }
}

impl NudgeTiming {
    /// Zero waits everywhere.
    pub fn instant() -> Self {
        Self {
            clear_settle: Duration::ZERO,
            inject_settle: Duration::ZERO,
            lull_window: Duration::ZERO,
            lull_poll: Duration::ZERO,
            lull_max_wait: Duration::ZERO,
        }
    }
}

/// The clear/inject/verify/restore state machine.
#[derive(Debug, Clone, Default)]
pub struct Nudger {
    timing: NudgeTiming,
}

impl Nudger {
    pub fn new() -> Self {
        Self { timing: NudgeTiming::default() }
    }

    pub fn with_timing(timing: NudgeTiming) -> Self {
        Self { timing }
    }

    /// Deliver `message` to the target's input line and submit it.
    pub async fn run<T: NudgeTarget + ?Sized>(
        &self,
        target: &T,
        message: &str,
    ) -> Result<NudgeReceipt, NudgeError> {
        if target.is_in_mode().await? {
            return Err(NudgeError::PaneInMode);
        }
        let scan = target.capture_tail(PASTE_SCAN_LINES).await?;
        if verify::has_paste_placeholder(&scan) {
            return Err(NudgeError::PastePlaceholder);
        }

        let before = target.capture_all().await?;
        let mut preserved = PreservedInput::default();
        let mut attempts = 0u32;

        let outcome = loop {
            attempts += 1;
            target.send_key("C-c").await?;
            tokio::time::sleep(self.timing.clear_settle).await;
            target.send_literal(message).await?;
            tokio::time::sleep(self.timing.inject_settle).await;

            let after = target.capture_tail(TAIL_LINES).await?;
            match verify::verify_integrity(&after, message) {
                None => break Err(NudgeError::NotFound),
                Some((stray_before, stray_after))
                    if stray_before.is_empty() && stray_after.is_empty() =>
                {
                    // Escape first for vim-style modal inputs, then submit.
                    target.send_key("Escape").await?;
                    target.send_key("Enter").await?;
                    break Ok(after);
                }
                Some((stray_before, stray_after)) => {
                    tracing::debug!(
                        attempts,
                        %stray_before,
                        %stray_after,
                        "operator typing detected, preserving and retrying"
                    );
                    preserved.extra_before.push_str(&stray_before);
                    preserved.extra_after.push_str(&stray_after);
                    if attempts > MAX_RETRIES {
                        break Err(NudgeError::MaxRetries { attempts });
                    }
                    self.wait_for_lull(target).await?;
                }
            }
        };

        match outcome {
            Ok(after) => {
                self.restore(target, &before, &after, message, &mut preserved).await?;
                tracing::info!(attempts, "nudge delivered");
                Ok(NudgeReceipt { attempts, preserved })
            }
            Err(error) => {
                // Give the operator their input back even on failure.
                let mut after = target.capture_tail(TAIL_LINES).await.unwrap_or_default();
                if matches!(error, NudgeError::NotFound) {
                    after.clear();
                }
                // Drop the unsubmitted injection before restoring.
                let _ = target.send_key("C-c").await;
                if let Err(restore_err) =
                    self.restore(target, &before, &after, message, &mut preserved).await
                {
                    tracing::warn!(error = %restore_err, "restore after failed nudge");
                }
                Err(error)
            }
        }
    }

    /// Re-send the operator's pre-nudge input (without Enter).
    async fn restore<T: NudgeTarget + ?Sized>(
        &self,
        target: &T,
        before: &str,
        after: &str,
        message: &str,
        preserved: &mut PreservedInput,
    ) -> Result<(), TmuxError> {
        let recovered = verify::find_original_input(before, after, message, CONTEXT_LINES)
            .or_else(|| verify::input_line(before));
        if let Some(original) = recovered {
            preserved.original = original;
            if preserved.extra_before == preserved.original {
                // Context recovery found the same line the strays came from.
                preserved.extra_before.clear();
            }
        }
        let combined = preserved.combined();
        if !combined.is_empty() {
            target.send_literal(&combined).await?;
        }
        target.wake_if_detached().await
    }

    async fn wait_for_lull<T: NudgeTarget + ?Sized>(&self, target: &T) -> Result<(), TmuxError> {
        let started = Instant::now();
        let mut last = target.capture_tail(LULL_TAIL_LINES).await?;
        let mut stable_since = Instant::now();
        while started.elapsed() < self.timing.lull_max_wait {
            tokio::time::sleep(self.timing.lull_poll).await;
            let tail = target.capture_tail(LULL_TAIL_LINES).await?;
            if tail == last {
                if stable_since.elapsed() >= self.timing.lull_window {
                    return Ok(());
                }
            } else {
                last = tail;
                stable_since = Instant::now();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
