//! Periodic sync task
//!
//! Runs a cycle immediately, then once per interval until shut down. A tick
//! that lands while a cycle is still running is dropped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::engine::{CycleOutcome, SyncEngine, SyncReport, SYNC_STARTED_MESSAGE};
use crate::notify::Notification;

/// Commands sent to the sync task
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Run a cycle now
    SyncNow,
    /// Stop the task
    Shutdown,
}

/// Events emitted by the sync task
#[derive(Debug, Clone)]
pub enum SyncTaskEvent {
    StatusChanged(SyncStatus),
    /// Something to show the user
    Notice(Notification),
    CycleCompleted(SyncReport),
    /// A cycle was requested while another was running
    CycleSkipped,
    CycleFailed(String),
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Waiting for the next tick
    Idle,
    /// A cycle is running
    Syncing,
    /// The task has exited
    Stopped,
}

/// Handle to control the periodic sync task
pub struct SyncHandle {
    /// Send commands to the sync task
    pub command_tx: mpsc::Sender<SyncCommand>,
    /// Receive events from the sync task
    pub event_rx: mpsc::Receiver<SyncTaskEvent>,
    /// Watch task status
    pub status_rx: watch::Receiver<SyncStatus>,
}

/// Spawn the periodic sync task on the current runtime
pub fn spawn_periodic_sync(engine: Arc<SyncEngine>, interval: Duration) -> SyncHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(SyncStatus::Idle);

    tokio::spawn(sync_task_loop(
        engine,
        interval.max(Duration::from_millis(1)),
        command_rx,
        event_tx,
        status_tx,
    ));

    SyncHandle {
        command_tx,
        event_rx,
        status_rx,
    }
}

async fn sync_task_loop(
    engine: Arc<SyncEngine>,
    interval: Duration,
    mut command_rx: mpsc::Receiver<SyncCommand>,
    event_tx: mpsc::Sender<SyncTaskEvent>,
    status_tx: watch::Sender<SyncStatus>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_once(&engine, &event_tx, &status_tx).await;
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(SyncCommand::SyncNow) => run_once(&engine, &event_tx, &status_tx).await,
                    Some(SyncCommand::Shutdown) | None => break,
                }
            }
        }
    }

    debug!("Sync task stopped");
    set_status(SyncStatus::Stopped, &event_tx, &status_tx);
}

async fn run_once(
    engine: &SyncEngine,
    event_tx: &mpsc::Sender<SyncTaskEvent>,
    status_tx: &watch::Sender<SyncStatus>,
) {
    if engine.is_syncing() {
        emit(event_tx, SyncTaskEvent::CycleSkipped);
        return;
    }

    set_status(SyncStatus::Syncing, event_tx, status_tx);
    emit(
        event_tx,
        SyncTaskEvent::Notice(Notification::info(SYNC_STARTED_MESSAGE)),
    );

    let outcome = engine.run_cycle().await;
    for notice in outcome.notifications() {
        emit(event_tx, SyncTaskEvent::Notice(notice));
    }
    match outcome {
        CycleOutcome::Completed(report) => emit(event_tx, SyncTaskEvent::CycleCompleted(report)),
        CycleOutcome::Failed(e) => emit(event_tx, SyncTaskEvent::CycleFailed(e.to_string())),
        CycleOutcome::Skipped => emit(event_tx, SyncTaskEvent::CycleSkipped),
    }

    set_status(SyncStatus::Idle, event_tx, status_tx);
}

fn set_status(
    status: SyncStatus,
    event_tx: &mpsc::Sender<SyncTaskEvent>,
    status_tx: &watch::Sender<SyncStatus>,
) {
    let _ = status_tx.send(status);
    emit(event_tx, SyncTaskEvent::StatusChanged(status));
}

/// Events are dropped when nobody keeps up with the channel
fn emit(event_tx: &mpsc::Sender<SyncTaskEvent>, event: SyncTaskEvent) {
    if event_tx.try_send(event).is_err() {
        debug!("Sync event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::QuoteStore;
    use crate::sync::testing::FakeRemote;
    use tokio::sync::Mutex;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn engine(remote: FakeRemote) -> Arc<SyncEngine> {
        let mut store =
            QuoteStore::with_backends(Box::new(MemoryStore::new()), Box::new(MemoryStore::new()))
                .unwrap();
        store.replace_all(Vec::new()).unwrap();
        Arc::new(SyncEngine::new(
            Arc::new(Mutex::new(store)),
            Arc::new(remote),
            5,
        ))
    }

    async fn next_report(handle: &mut SyncHandle) -> SyncReport {
        loop {
            let event = timeout(WAIT, handle.event_rx.recv())
                .await
                .expect("timed out waiting for sync event")
                .expect("sync task closed its channel");
            if let SyncTaskEvent::CycleCompleted(report) = event {
                return report;
            }
        }
    }

    #[tokio::test]
    async fn test_first_cycle_runs_immediately() {
        let engine = engine(FakeRemote::with_titles(&["one", "two"]));
        let mut handle = spawn_periodic_sync(engine.clone(), Duration::from_secs(3600));

        let report = next_report(&mut handle).await;

        assert_eq!(report.added, 2);
        assert_eq!(engine.store().lock().await.len(), 2);
        handle.command_tx.send(SyncCommand::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_sync_now_runs_another_cycle() {
        let engine = engine(FakeRemote::with_titles(&["one"]));
        let mut handle = spawn_periodic_sync(engine, Duration::from_secs(3600));
        next_report(&mut handle).await;

        handle.command_tx.send(SyncCommand::SyncNow).await.unwrap();
        let report = next_report(&mut handle).await;

        assert_eq!(report.added, 0);
        handle.command_tx.send(SyncCommand::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let engine = engine(FakeRemote::default());
        let mut handle = spawn_periodic_sync(engine, Duration::from_secs(3600));
        next_report(&mut handle).await;

        handle.command_tx.send(SyncCommand::Shutdown).await.unwrap();

        timeout(
            WAIT,
            handle.status_rx.wait_for(|s| *s == SyncStatus::Stopped),
        )
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn test_cycle_emits_start_notice() {
        let engine = engine(FakeRemote::with_titles(&["one"]));
        let mut handle = spawn_periodic_sync(engine, Duration::from_secs(3600));

        let mut messages = Vec::new();
        loop {
            match timeout(WAIT, handle.event_rx.recv()).await.unwrap() {
                Some(SyncTaskEvent::Notice(n)) => messages.push(n.message),
                Some(SyncTaskEvent::CycleCompleted(_)) => break,
                Some(_) => {}
                None => panic!("sync task closed its channel"),
            }
        }

        assert!(messages[0].starts_with(SYNC_STARTED_MESSAGE));
        assert!(messages[1].starts_with("Sync completed! Added 1 new quotes"));
        handle.command_tx.send(SyncCommand::Shutdown).await.unwrap();
    }
}
