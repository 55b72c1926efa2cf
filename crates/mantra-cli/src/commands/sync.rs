//! Sync command handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use mantra_core::sync::{
    spawn_periodic_sync, SyncCommand, SyncStatus, SyncTaskEvent, SYNC_STARTED_MESSAGE,
};
use mantra_core::{Config, CycleOutcome, Notification, QuoteStore, SyncEngine};

use super::storage_failure;
use crate::output::{print_json, Output, OutputFormat};

/// Run a single sync cycle
pub async fn sync(store: QuoteStore, config: &Config, output: &Output) -> Result<()> {
    let engine = engine_for(store, config)?;

    if !output.is_json() {
        output.notice(&Notification::info(SYNC_STARTED_MESSAGE));
    }

    let outcome = engine.run_cycle().await;

    match output.format {
        OutputFormat::Json => {
            if let CycleOutcome::Completed(report) = &outcome {
                print_json(report);
            }
        }
        _ => {
            for notice in outcome.notifications() {
                output.notice(&notice);
            }
            if let CycleOutcome::Completed(report) = &outcome {
                output.message(&format!(
                    "  Fetched {}, posted {} ({} failed)",
                    report.fetched, report.pushed.posted, report.pushed.failed
                ));
            }
        }
    }

    match outcome {
        CycleOutcome::Failed(e) => Err(storage_failure(e, "Sync failed")),
        _ => Ok(()),
    }
}

/// Sync periodically until Ctrl-C
pub async fn watch(
    store: QuoteStore,
    config: &Config,
    interval_secs: Option<u64>,
    output: &Output,
) -> Result<()> {
    let interval = interval_secs
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| config.sync_interval());
    let engine = Arc::new(engine_for(store, config)?);

    let mut handle = spawn_periodic_sync(engine, interval);
    output.message(&format!(
        "Syncing with {} every {}s. Press Ctrl-C to stop.",
        config.api_url,
        interval.as_secs()
    ));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = handle.event_rx.recv() => match event {
                Some(SyncTaskEvent::Notice(notice)) => output.notice(&notice),
                Some(SyncTaskEvent::CycleCompleted(report)) => {
                    if output.is_json() {
                        print_json(&report);
                    }
                }
                Some(SyncTaskEvent::CycleFailed(e)) => warn!("Sync cycle failed: {}", e),
                Some(SyncTaskEvent::CycleSkipped) => debug!("Sync cycle skipped"),
                Some(SyncTaskEvent::StatusChanged(SyncStatus::Stopped)) | None => break,
                Some(SyncTaskEvent::StatusChanged(status)) => debug!("Sync status: {:?}", status),
            },
            _ = &mut ctrl_c => {
                let _ = handle.command_tx.send(SyncCommand::Shutdown).await;
                output.message("Stopped.");
                break;
            }
        }
    }

    Ok(())
}

fn engine_for(store: QuoteStore, config: &Config) -> Result<SyncEngine> {
    if !config.sync_enabled {
        bail!(
            "Sync is not enabled. Enable it with:\n  \
             mantra config set sync_enabled true"
        );
    }

    SyncEngine::from_config(Arc::new(Mutex::new(store)), config)
        .context("Failed to set up the sync client")
}
