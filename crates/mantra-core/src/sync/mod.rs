//! Synchronization with the remote quote collection
//!
//! The remote is a REST collection of posts. Sync is pull-then-merge with
//! last-write-wins on the record timestamp; local quotes the remote hasn't
//! acknowledged are POSTed along the way.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Arc::new(Mutex::new(QuoteStore::open_with_config(&config)?));
//! let engine = Arc::new(SyncEngine::from_config(store, &config)?);
//!
//! // One cycle
//! let outcome = engine.run_cycle().await;
//!
//! // Or every `sync_interval_secs`
//! let mut handle = spawn_periodic_sync(engine, config.sync_interval());
//! while let Some(event) = handle.event_rx.recv().await { /* ... */ }
//! ```

mod engine;
mod merge;
mod remote;
mod scheduler;
#[cfg(test)]
mod testing;

pub use engine::{
    fallback_quotes, fetch_remote_quotes, push_quotes, CycleOutcome, PushReport, SyncEngine,
    SyncReport, SERVER_CATEGORY, SYNC_FAILED_MESSAGE, SYNC_STARTED_MESSAGE,
};
pub use merge::{merge, MergeOutcome};
pub use remote::{HttpRemote, NewPost, QuoteRemote, RemoteError, RemotePost, RemoteResult};
pub use scheduler::{spawn_periodic_sync, SyncCommand, SyncHandle, SyncStatus, SyncTaskEvent};
