//! Quote store
//!
//! `QuoteStore` owns the quote collection and the user's view state
//! (selected category, last viewed quote, last sync time). Every mutation
//! rewrites the whole collection to the durable key-value store.
//!
//! ## Identity
//!
//! Ids are expected to be unique but this is **not enforced**: imports may
//! bring in duplicates and merges match records by id *or* text. Callers
//! that need a single record should not rely on id lookups alone.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = QuoteStore::open()?;
//!
//! store.add_quote("Well done is better than well said.", "wisdom")?;
//! store.set_category_filter("wisdom")?;
//! let quote = store.random_quote()?;
//! ```

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{now_iso, Quote, QuoteError, QuoteId};
use crate::storage::{keys, FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult};
use crate::transfer::{self, ImportError};

/// Filter value that selects every category
pub const ALL_CATEGORIES: &str = "all";

/// Quotes the collection starts with on first run
const INITIAL_QUOTES: &[(&str, &str)] = &[
    (
        "The only way to do great work is to love what you do.",
        "motivation",
    ),
    (
        "Innovation distinguishes between a leader and a follower.",
        "innovation",
    ),
    (
        "Life is what happens to you while you're busy making other plans.",
        "life",
    ),
    (
        "The future belongs to those who believe in the beauty of their dreams.",
        "dreams",
    ),
    (
        "It is during our darkest moments that we must focus to see the light.",
        "inspiration",
    ),
    (
        "Success is not final, failure is not fatal: it is the courage to continue that counts.",
        "success",
    ),
    (
        "The only impossible journey is the one you never begin.",
        "motivation",
    ),
    (
        "In the middle of difficulty lies opportunity.",
        "opportunity",
    ),
];

/// Errors from store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Summary of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub rejected: usize,
}

/// Collection statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteStats {
    pub total: usize,
    pub categories: usize,
    pub average_length: f64,
}

/// Owner of the quote collection
pub struct QuoteStore {
    /// The collection, in insertion order
    quotes: Vec<Quote>,
    /// `all` or a category name
    selected_category: String,
    /// Survives restarts
    durable: Box<dyn KeyValueStore>,
    /// Lives as long as the process
    session: Box<dyn KeyValueStore>,
}

impl QuoteStore {
    /// Open the store using the configuration from the default location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let durable = FileStore::open(config.storage_dir())
            .context("Failed to open quote storage")?;
        Self::with_backends(Box::new(durable), Box::new(MemoryStore::new()))
            .context("Failed to load quotes")
    }

    /// Open the store on explicit key-value backends
    ///
    /// Seeds the built-in quotes when nothing is stored yet. A stored
    /// collection that can't be parsed is replaced in memory by the seed
    /// quotes but left on disk until the next save.
    pub fn with_backends(
        durable: Box<dyn KeyValueStore>,
        session: Box<dyn KeyValueStore>,
    ) -> StorageResult<Self> {
        let selected_category = durable
            .get(keys::SELECTED_CATEGORY)?
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| ALL_CATEGORIES.to_string());

        let mut store = Self {
            quotes: Vec::new(),
            selected_category,
            durable,
            session,
        };

        match store.durable.get(keys::QUOTES)? {
            Some(json) => match serde_json::from_str::<Vec<Quote>>(&json) {
                Ok(quotes) => store.quotes = quotes,
                Err(e) => {
                    warn!("Stored quotes are unreadable, using initial quotes: {}", e);
                    store.quotes = initial_quotes();
                }
            },
            None => {
                debug!("No stored quotes, seeding {} initial quotes", INITIAL_QUOTES.len());
                store.quotes = initial_quotes();
                store.save()?;
            }
        }

        Ok(store)
    }

    // ==================== Collection ====================

    /// All quotes in insertion order
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Add a quote typed by the user
    ///
    /// The text is trimmed and must not be empty; the category defaults to
    /// `general` and is lower-cased.
    pub fn add_quote(&mut self, text: &str, category: &str) -> StoreResult<Quote> {
        let quote = Quote::new(text, category)?;
        self.quotes.push(quote.clone());
        self.save()?;
        Ok(quote)
    }

    /// Replace the whole collection and persist it
    pub fn replace_all(&mut self, quotes: Vec<Quote>) -> StorageResult<()> {
        self.quotes = quotes;
        self.save()
    }

    /// Clones of the records the remote has not acknowledged
    pub fn unsynced(&self) -> Vec<Quote> {
        self.quotes
            .iter()
            .filter(|q| q.is_unsynced())
            .cloned()
            .collect()
    }

    /// Flag the first unsynced quote with this id and text as synced
    ///
    /// Matching on text as well keeps a duplicate id from flagging the
    /// wrong record. Returns whether a record was flagged. Does not save.
    pub fn mark_synced(&mut self, id: &QuoteId, text: &str) -> bool {
        match self
            .quotes
            .iter_mut()
            .find(|q| q.is_unsynced() && &q.id == id && q.text == text)
        {
            Some(quote) => {
                quote.mark_synced();
                true
            }
            None => false,
        }
    }

    /// Remove every quote
    pub fn clear(&mut self) -> StorageResult<()> {
        self.quotes.clear();
        self.save()
    }

    /// Write the collection and its modification time
    pub fn save(&mut self) -> StorageResult<()> {
        let json = serde_json::to_string(&self.quotes)
            .map_err(|e| StorageError::serialization(keys::QUOTES, e))?;
        self.durable.set(keys::QUOTES, &json)?;
        self.durable.set(keys::LAST_MODIFIED, &now_iso())?;
        Ok(())
    }

    /// When the collection was last written
    pub fn last_modified(&self) -> Option<String> {
        self.durable.get(keys::LAST_MODIFIED).ok().flatten()
    }

    // ==================== Categories & filtering ====================

    /// Sorted unique categories of the current collection
    pub fn categories(&self) -> Vec<String> {
        self.quotes
            .iter()
            .map(|q| q.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Categories with the number of quotes in each
    pub fn categories_with_counts(&self) -> Vec<(String, usize)> {
        self.categories()
            .into_iter()
            .map(|c| {
                let count = self.quotes.iter().filter(|q| q.category == c).count();
                (c, count)
            })
            .collect()
    }

    /// The active filter, `all` or a category name
    pub fn selected_category(&self) -> &str {
        &self.selected_category
    }

    /// Spelling of `name` as it appears in the collection
    ///
    /// An exact match wins, then a case-insensitive one. Unknown names come
    /// back trimmed but otherwise untouched.
    pub fn canonical_category(&self, name: &str) -> String {
        let name = name.trim();
        if self.quotes.iter().any(|q| q.category == name) {
            return name.to_string();
        }
        let lowered = name.to_lowercase();
        self.categories()
            .into_iter()
            .find(|c| c.to_lowercase() == lowered)
            .unwrap_or_else(|| name.to_string())
    }

    /// Change the active filter and remember it
    ///
    /// Blank and any casing of `all` clear the filter.
    pub fn set_category_filter(&mut self, category: &str) -> StorageResult<()> {
        let category = match category.trim() {
            "" => ALL_CATEGORIES.to_string(),
            c if c.eq_ignore_ascii_case(ALL_CATEGORIES) => ALL_CATEGORIES.to_string(),
            c => self.canonical_category(c),
        };
        self.durable.set(keys::SELECTED_CATEGORY, &category)?;
        self.selected_category = category;
        Ok(())
    }

    /// Fall back to `all` when the selected category no longer exists
    ///
    /// Returns whether the filter changed.
    pub fn refresh_filter(&mut self) -> StorageResult<bool> {
        if self.selected_category == ALL_CATEGORIES
            || self.quotes.iter().any(|q| q.category == self.selected_category)
        {
            return Ok(false);
        }
        debug!(
            "Category '{}' is gone, resetting filter",
            self.selected_category
        );
        self.set_category_filter(ALL_CATEGORIES)?;
        Ok(true)
    }

    /// Quotes matching the active filter
    pub fn filtered(&self) -> Vec<&Quote> {
        if self.selected_category == ALL_CATEGORIES {
            self.quotes.iter().collect()
        } else {
            self.quotes
                .iter()
                .filter(|q| q.category == self.selected_category)
                .collect()
        }
    }

    /// Case-insensitive search over text and category
    ///
    /// A blank term returns the filtered quotes.
    pub fn search(&self, term: &str) -> Vec<&Quote> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.filtered();
        }
        self.quotes
            .iter()
            .filter(|q| {
                q.text.to_lowercase().contains(&term) || q.category.to_lowercase().contains(&term)
            })
            .collect()
    }

    // ==================== Viewing ====================

    /// Pick a random quote from the filtered set
    ///
    /// The pick is remembered in the session store. Returns `None` when no
    /// quote matches the filter.
    pub fn random_quote(&mut self) -> StorageResult<Option<Quote>> {
        let candidates = self.filtered();
        if candidates.is_empty() {
            return Ok(None);
        }

        // uuid is the crate's randomness source; a v4 id is 122 random bits
        let index = (Uuid::new_v4().as_u128() % candidates.len() as u128) as usize;
        let quote = candidates[index].clone();

        let json = serde_json::to_string(&quote)
            .map_err(|e| StorageError::serialization(keys::LAST_VIEWED_QUOTE, e))?;
        self.session.set(keys::LAST_VIEWED_QUOTE, &json)?;

        Ok(Some(quote))
    }

    /// The quote most recently shown in this session
    ///
    /// The session store lives as long as this `QuoteStore`, so this is
    /// meant for long-lived embedders. A one-shot CLI run starts empty.
    pub fn last_viewed(&self) -> Option<Quote> {
        let json = self.session.get(keys::LAST_VIEWED_QUOTE).ok().flatten()?;
        match serde_json::from_str(&json) {
            Ok(quote) => Some(quote),
            Err(e) => {
                debug!("Could not restore last viewed quote: {}", e);
                None
            }
        }
    }

    // ==================== Import / export ====================

    /// Append the valid quotes of an import document
    pub fn import_json(&mut self, content: &str) -> StoreResult<ImportReport> {
        let outcome = transfer::import(content)?;
        let report = ImportReport {
            imported: outcome.quotes.len(),
            rejected: outcome.rejected,
        };
        self.quotes.extend(outcome.quotes);
        self.save()?;
        Ok(report)
    }

    /// The whole collection as pretty-printed JSON
    pub fn export_json(&self) -> serde_json::Result<String> {
        transfer::export(&self.quotes)
    }

    /// One category as pretty-printed JSON
    pub fn export_category_json(&self, category: &str) -> serde_json::Result<String> {
        transfer::export_category(&self.quotes, category)
    }

    // ==================== Sync bookkeeping ====================

    /// When the last sync cycle completed
    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.durable.get(keys::LAST_SYNC_TIME).ok().flatten()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Remember when a sync cycle completed
    pub fn record_sync(&mut self, at: DateTime<Utc>) -> StorageResult<()> {
        self.durable.set(keys::LAST_SYNC_TIME, &at.to_rfc3339())
    }

    // ==================== Stats ====================

    pub fn stats(&self) -> QuoteStats {
        let total = self.quotes.len();
        let average_length = if total == 0 {
            0.0
        } else {
            let chars: usize = self.quotes.iter().map(|q| q.text.chars().count()).sum();
            chars as f64 / total as f64
        };

        QuoteStats {
            total,
            categories: self.categories().len(),
            average_length,
        }
    }
}

/// Fresh copies of the built-in quotes
fn initial_quotes() -> Vec<Quote> {
    INITIAL_QUOTES
        .iter()
        .map(|(text, category)| Quote::with_id(QuoteId::generate(), *text, *category, now_iso()))
        .collect()
}
