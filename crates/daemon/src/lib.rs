// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gt-daemon: long-running supervision for pod-hosted agent fleets.
//!
//! Watches a rig's pods, keeps one local pipe session per running pod, and
//! heals dropped pipes with bounded reconnects. Pane-level behavior lives
//! in gt-adapters; this crate only orchestrates.

pub mod pods;

pub use pods::inventory::{PodInventory, PodSource, PodSourceError};
pub use pods::server::{PipeServer, ServerStatus};
