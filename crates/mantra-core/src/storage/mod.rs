//! Storage layer
//!
//! Key-value persistence for the quote collection and user preferences.
//!
//! ## Layout
//!
//! - **Durable store**: one file per key under `<data_dir>/storage/`,
//!   written atomically
//! - **Session store**: in memory, dropped when the process exits
//!
//! Values are plain text; the quote collection is one JSON array
//! rewritten on every change.

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{FileStore, KeyValueStore, MemoryStore};

/// Well-known storage keys
pub mod keys {
    /// Entire quote collection as a JSON array
    pub const QUOTES: &str = "quotes";
    /// ISO time of the last write of `QUOTES`
    pub const LAST_MODIFIED: &str = "lastModified";
    /// Selected category filter (`all` or a category name)
    pub const SELECTED_CATEGORY: &str = "selectedCategory";
    /// ISO time of the last completed sync cycle
    pub const LAST_SYNC_TIME: &str = "lastSyncTime";
    /// Last quote shown to the user (session store)
    pub const LAST_VIEWED_QUOTE: &str = "lastViewedQuote";
}
