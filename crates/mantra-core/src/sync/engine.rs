//! Sync cycle
//!
//! One cycle fetches the remote collection, pushes local quotes the remote
//! hasn't seen, merges the remote records into the store and stamps the
//! sync time. The remote is never awaited while the store lock is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::merge::merge;
use super::remote::{HttpRemote, NewPost, QuoteRemote, RemoteResult};
use crate::config::Config;
use crate::models::{now_iso, Quote, QuoteId};
use crate::notify::Notification;
use crate::storage::{StorageError, StorageResult};
use crate::store::QuoteStore;

/// Category given to every fetched quote
pub const SERVER_CATEGORY: &str = "server";

/// Shown when a cycle starts
pub const SYNC_STARTED_MESSAGE: &str = "Syncing with server...";

/// Shown when a cycle fails
pub const SYNC_FAILED_MESSAGE: &str = "Sync failed. Please try again later.";

/// Served when the remote can't be reached
const FALLBACK_QUOTES: &[(&str, &str, &str)] = &[
    (
        "1",
        "The best time to plant a tree was 20 years ago. The second best time is now.",
        "wisdom",
    ),
    (
        "2",
        "Your limitation\u{2014}it's only your imagination.",
        "motivation",
    ),
];

/// Quotes used in place of an unreachable remote
pub fn fallback_quotes() -> Vec<Quote> {
    let timestamp = now_iso();
    FALLBACK_QUOTES
        .iter()
        .map(|(id, text, category)| {
            Quote::with_id(QuoteId::server(id), *text, *category, timestamp.clone())
        })
        .collect()
}

/// Fetch the first `limit` remote posts as quotes
///
/// Never fails: any remote error is logged and [`fallback_quotes`] is
/// returned instead.
pub async fn fetch_remote_quotes(remote: &dyn QuoteRemote, limit: usize) -> Vec<Quote> {
    match remote.fetch_posts().await {
        Ok(posts) => {
            let timestamp = now_iso();
            posts
                .into_iter()
                .take(limit)
                .map(|post| {
                    Quote::with_id(
                        QuoteId::server(&post.id),
                        post.title,
                        SERVER_CATEGORY,
                        timestamp.clone(),
                    )
                })
                .collect()
        }
        Err(e) => {
            warn!("Error fetching from server, using fallback quotes: {}", e);
            fallback_quotes()
        }
    }
}

/// Outcome of pushing unsynced quotes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub posted: usize,
    pub failed: usize,
}

/// Post every unsynced quote in `quotes`, flagging the accepted ones
///
/// Failures are logged and leave the quote unsynced for the next attempt.
pub async fn push_quotes(remote: &dyn QuoteRemote, quotes: &mut [Quote]) -> PushReport {
    let mut report = PushReport::default();

    for quote in quotes.iter_mut().filter(|q| q.is_unsynced()) {
        match post_quote(remote, quote).await {
            Ok(()) => {
                quote.mark_synced();
                report.posted += 1;
            }
            Err(e) => {
                warn!("Error posting quote {} to server: {}", quote.id, e);
                report.failed += 1;
            }
        }
    }

    report
}

async fn post_quote(remote: &dyn QuoteRemote, quote: &Quote) -> RemoteResult<()> {
    remote.create_post(&NewPost::from_quote(quote)).await?;
    debug!("Posted quote {}", quote.id);
    Ok(())
}

/// Summary of a completed cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    /// Remote records considered for the merge
    pub fetched: usize,
    pub pushed: PushReport,
    /// Remote records appended
    pub added: usize,
    /// Local records replaced by newer remote ones
    pub resolved: usize,
    /// Replacements that changed a record's content
    pub conflicts: usize,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// User-facing summary of the cycle
    pub fn notifications(&self) -> Vec<Notification> {
        let mut notices = Vec::new();

        if self.added > 0 {
            notices.push(Notification::success(format!(
                "Sync completed! Added {} new quotes from server.",
                self.added
            )));
        }
        if self.conflicts > 0 {
            notices.push(Notification::info(format!(
                "Resolved {} conflicts. Server data took precedence.",
                self.conflicts
            )));
        }
        if notices.is_empty() {
            notices.push(Notification::info(
                "Sync completed! Your quotes are up to date.",
            ));
        }

        notices
    }
}

/// Result of asking for a cycle
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(SyncReport),
    /// The merged collection couldn't be persisted
    Failed(StorageError),
    /// Another cycle was already running
    Skipped,
}

impl CycleOutcome {
    pub fn notifications(&self) -> Vec<Notification> {
        match self {
            CycleOutcome::Completed(report) => report.notifications(),
            CycleOutcome::Failed(_) => vec![Notification::error(SYNC_FAILED_MESSAGE)],
            CycleOutcome::Skipped => Vec::new(),
        }
    }
}

/// Runs sync cycles against a shared store, at most one at a time
pub struct SyncEngine {
    store: Arc<Mutex<QuoteStore>>,
    remote: Arc<dyn QuoteRemote>,
    fetch_limit: usize,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a cycle ends or is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(
        store: Arc<Mutex<QuoteStore>>,
        remote: Arc<dyn QuoteRemote>,
        fetch_limit: usize,
    ) -> Self {
        Self {
            store,
            remote,
            fetch_limit,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Engine talking to the configured HTTP endpoint
    pub fn from_config(store: Arc<Mutex<QuoteStore>>, config: &Config) -> RemoteResult<Self> {
        let remote = HttpRemote::from_config(config)?;
        Ok(Self::new(store, Arc::new(remote), config.fetch_limit))
    }

    pub fn store(&self) -> &Arc<Mutex<QuoteStore>> {
        &self.store
    }

    /// Whether a cycle is running right now
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one cycle unless one is already running
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Sync already in progress, skipping");
            return CycleOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        match self.cycle().await {
            Ok(report) => {
                info!(
                    "Sync completed: {} fetched, {} pushed, {} added, {} resolved",
                    report.fetched, report.pushed.posted, report.added, report.resolved
                );
                CycleOutcome::Completed(report)
            }
            Err(e) => {
                warn!("Sync failed: {}", e);
                CycleOutcome::Failed(e)
            }
        }
    }

    /// Push unsynced quotes outside a cycle and persist the flags
    pub async fn push_pending(&self) -> StorageResult<PushReport> {
        let (report, accepted) = self.push_unsynced().await;
        if report.posted > 0 {
            let mut store = self.store.lock().await;
            flag_accepted(&mut store, &accepted);
            store.save()?;
        }
        Ok(report)
    }

    async fn cycle(&self) -> StorageResult<SyncReport> {
        info!("Checking for server updates...");
        let remote_quotes = fetch_remote_quotes(self.remote.as_ref(), self.fetch_limit).await;
        let (pushed, accepted) = self.push_unsynced().await;

        let mut store = self.store.lock().await;
        flag_accepted(&mut store, &accepted);

        let outcome = merge(store.quotes(), &remote_quotes);
        store.replace_all(outcome.quotes)?;
        store.refresh_filter()?;

        let finished_at = Utc::now();
        store.record_sync(finished_at)?;

        Ok(SyncReport {
            fetched: remote_quotes.len(),
            pushed,
            added: outcome.added,
            resolved: outcome.resolved,
            conflicts: outcome.conflicts,
            finished_at,
        })
    }

    /// Post a snapshot of the unsynced quotes without holding the lock
    async fn push_unsynced(&self) -> (PushReport, Vec<Quote>) {
        let mut pending = self.store.lock().await.unsynced();
        let report = push_quotes(self.remote.as_ref(), &mut pending).await;
        let accepted = pending.into_iter().filter(|q| !q.is_unsynced()).collect();
        (report, accepted)
    }
}

fn flag_accepted(store: &mut QuoteStore, accepted: &[Quote]) {
    for quote in accepted {
        if !store.mark_synced(&quote.id, &quote.text) {
            debug!("Posted quote {} is no longer in the store", quote.id);
        }
    }
}
