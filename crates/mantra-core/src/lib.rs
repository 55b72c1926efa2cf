//! Mantra Core Library
//!
//! This crate provides the core functionality for Mantra, a local quote
//! collection that keeps itself in step with a remote quote service.
//!
//! # Architecture
//!
//! - **QuoteStore**: owns the collection and view state, persisted as JSON
//!   values in a key-value directory
//! - **SyncEngine**: fetch, push and last-write-wins merge against the
//!   remote, at most one cycle at a time
//!
//! # Quick Start
//!
//! ```text
//! let mut store = QuoteStore::open()?;
//!
//! // Add a quote
//! store.add_quote("Simplicity is prerequisite for reliability.", "engineering")?;
//!
//! // Show one
//! if let Some(quote) = store.random_quote()? {
//!     println!("{}", quote);
//! }
//! ```
//!
//! # Modules
//!
//! - `store`: Quote collection (main entry point)
//! - `models`: Quote records and their sync origin
//! - `storage`: Key-value persistence
//! - `transfer`: JSON export and import
//! - `sync`: Remote fetch, push, merge and the periodic task
//! - `notify`: Transient status messages
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod notify;
pub mod storage;
pub mod store;
pub mod sync;
pub mod transfer;

pub use config::Config;
pub use models::{Quote, QuoteError, QuoteId, QuoteOrigin};
pub use notify::{Notification, Severity};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{ImportReport, QuoteStats, QuoteStore, StoreError};
pub use sync::{CycleOutcome, SyncEngine, SyncReport};
