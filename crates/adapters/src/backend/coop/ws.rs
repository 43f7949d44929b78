// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket state watcher — subscribes to coop's state stream and fans
//! frames out to consumers.
//!
//! Frames with `event ∈ {transition, exit}` become [`AgentStateEvent`]s;
//! unknown frames are dropped silently. Transitions land in a bounded
//! state channel (overflow drops — consumers tolerate seq gaps); the exit
//! lands in a one-shot channel and ends the watch. Dropped connections
//! reconnect after a fixed short delay.

use futures_util::StreamExt;
use gt_core::{AgentStateEvent, PromptInfo};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Delay between reconnect attempts after a dropped stream.
pub const WS_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Bounded buffer of pending transitions.
pub const STATE_BUFFER: usize = 64;

/// Handle to a running state subscription.
pub struct CoopStateWatcher {
    state_rx: mpsc::Receiver<AgentStateEvent>,
    exit_rx: Option<oneshot::Receiver<i32>>,
    cancel: CancellationToken,
}

impl CoopStateWatcher {
    /// Next buffered event; `None` once the watch has ended and drained.
    pub async fn next_event(&mut self) -> Option<AgentStateEvent> {
        self.state_rx.recv().await
    }

    /// One-shot exit channel. `None` after it has been taken.
    pub fn take_exit(&mut self) -> Option<oneshot::Receiver<i32>> {
        self.exit_rx.take()
    }

    /// Stop watching. Returns promptly even if the remote holds the socket.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for CoopStateWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Subscribe to a coop sidecar's state stream.
pub fn watch_state(base_url: &str, token: Option<String>) -> CoopStateWatcher {
    let (state_tx, state_rx) = mpsc::channel(STATE_BUFFER);
    let (exit_tx, exit_rx) = oneshot::channel();
    let cancel = CancellationToken::new();
    let url = ws_url(base_url, token.as_deref());
    tokio::spawn(run_bridge(url, state_tx, exit_tx, cancel.clone()));
    CoopStateWatcher { state_rx, exit_rx: Some(exit_rx), cancel }
}

/// Build the subscription URL from a coop base URL.
pub(crate) fn ws_url(base_url: &str, token: Option<&str>) -> String {
    let rest = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("ws://"))
        .unwrap_or(base_url);
    let host = rest.split('/').next().unwrap_or(rest);
    let mut url = format!("ws://{}/ws?subscribe=state", host);
    if let Some(token) = token {
        url.push_str("&token=");
        url.push_str(token);
    }
    url
}

async fn run_bridge(
    url: String,
    state_tx: mpsc::Sender<AgentStateEvent>,
    exit_tx: oneshot::Sender<i32>,
    cancel: CancellationToken,
) {
    let mut exit_tx = Some(exit_tx);
    loop {
        let connect = tokio::select! {
            _ = cancel.cancelled() => return,
            connect = tokio_tungstenite::connect_async(&url) => connect,
        };
        match connect {
            Ok((ws, _)) => {
                tracing::debug!(%url, "state watch connected");
                let (_, mut read) = ws.split();
                loop {
                    let message = tokio::select! {
                        _ = cancel.cancelled() => return,
                        message = read.next() => message,
                    };
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match parse_state_frame(&text) {
                                Some(AgentStateEvent::Exit { code }) => {
                                    let _ = state_tx
                                        .try_send(AgentStateEvent::Exit { code });
                                    if let Some(tx) = exit_tx.take() {
                                        let _ = tx.send(code.unwrap_or(0));
                                    }
                                    // Exit is terminal for the stream.
                                    return;
                                }
                                Some(event) => {
                                    // Full buffer drops the frame; consumers
                                    // tolerate seq gaps.
                                    let _ = state_tx.try_send(event);
                                }
                                None => {}
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::debug!(%url, "state stream closed, reconnecting");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::debug!(%url, error = %e, "state stream error, reconnecting");
                            break;
                        }
                        _ => {} // Ping/Pong/Binary — ignore
                    }
                }
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "state watch connect failed");
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(WS_RECONNECT_DELAY) => {}
        }
    }
}

/// Decode one WebSocket frame into a state event. Unknown frames → `None`.
pub(crate) fn parse_state_frame(text: &str) -> Option<AgentStateEvent> {
    let json: serde_json::Value = serde_json::from_str(text).ok()?;
    match json.get("event")?.as_str()? {
        "transition" => {
            let prev = json.get("prev").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let next = json.get("next").and_then(|v| v.as_str())?.to_string();
            let seq = json.get("seq").and_then(|v| v.as_u64()).unwrap_or(0);
            let prompt = json
                .get("prompt")
                .filter(|p| !p.is_null())
                .and_then(|p| serde_json::from_value::<PromptInfo>(p.clone()).ok());
            Some(AgentStateEvent::Transition { prev, next, seq, prompt })
        }
        "exit" => {
            let code = json.get("code").and_then(|v| v.as_i64()).map(|c| c as i32);
            Some(AgentStateEvent::Exit { code })
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
