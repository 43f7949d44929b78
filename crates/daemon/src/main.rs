// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gtd: pod-pipe supervisor daemon.
//!
//! Keeps one local tmux pipe per running agent pod in a rig. Rig and
//! namespace come from the environment; everything else (work assignment,
//! the ledger, dashboards) lives elsewhere and talks to agents through the
//! backend surface.

use gt_adapters::tmux::TmuxClient;
use gt_daemon::pods::inventory::PodInventory;
use gt_daemon::pods::kube::KubePodSource;
use gt_daemon::PipeServer;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let rig = std::env::var("GT_RIG").unwrap_or_else(|_| "rig1".to_string());
    let namespace = std::env::var("GT_NAMESPACE").unwrap_or_else(|_| "gastown".to_string());

    let source = KubePodSource::new(&namespace, &rig).await?;
    let inventory = PodInventory::new(source);
    let server = PipeServer::new(rig, namespace, TmuxClient::new());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    server.run(inventory, cancel).await;
    Ok(())
}
