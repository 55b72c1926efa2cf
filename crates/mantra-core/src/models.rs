//! Data models for Mantra
//!
//! Defines the core data structures: Quote, QuoteId and QuoteOrigin.
//!
//! The on-disk layout keeps the flat flag fields (`synced`, `fromServer`,
//! `resolved`) so stored collections and exported files stay readable by
//! older tools. In memory those flags are folded into a single
//! [`QuoteOrigin`] so impossible combinations can't be represented.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category assigned when the user leaves it blank
pub const DEFAULT_CATEGORY: &str = "general";

/// Prefix used for ids of records that came from the remote source
pub const SERVER_ID_PREFIX: &str = "server_";

/// Last generated client id, used to keep ids strictly increasing
static LAST_CLIENT_ID: AtomicI64 = AtomicI64::new(0);

/// Errors raised when building a quote from user input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuoteError {
    /// Quote text was empty after trimming
    #[error("Please enter a quote text.")]
    EmptyText,
}

/// Identifier of a quote
///
/// Client-created quotes use numbers, remote ones use strings such as
/// `server_3`. Numbers are kept exactly as read so imported ids survive a
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuoteId {
    Number(serde_json::Number),
    Text(String),
}

impl QuoteId {
    /// Generate a new client id
    ///
    /// Based on the current unix time in milliseconds, bumped when needed so
    /// that two ids generated in the same millisecond still differ.
    pub fn generate() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut prev = LAST_CLIENT_ID.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match LAST_CLIENT_ID.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return QuoteId::Number(next.into()),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Build the id of a record mapped from a remote item
    pub fn server(remote_id: impl fmt::Display) -> Self {
        QuoteId::Text(format!("{}{}", SERVER_ID_PREFIX, remote_id))
    }

    /// Whether this id was assigned to a remote record
    pub fn is_server(&self) -> bool {
        matches!(self, QuoteId::Text(s) if s.starts_with(SERVER_ID_PREFIX))
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteId::Number(n) => write!(f, "{}", n),
            QuoteId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for QuoteId {
    fn from(n: i64) -> Self {
        QuoteId::Number(n.into())
    }
}

impl From<&str> for QuoteId {
    fn from(s: &str) -> Self {
        QuoteId::Text(s.to_string())
    }
}

/// Where a quote came from and how far it has been synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteOrigin {
    /// Created on this device (typed in or imported)
    Local {
        /// Set once the remote accepted a POST of this quote
        synced: bool,
    },
    /// Appended by a merge because nothing local matched it
    ServerOriginated,
    /// Replaced a local record during a merge because it was newer
    ///
    /// Still posted back to the remote like a local quote.
    ResolvedFromConflict {
        /// Set once the remote accepted a POST of this record
        synced: bool,
    },
}

impl Default for QuoteOrigin {
    fn default() -> Self {
        QuoteOrigin::Local { synced: false }
    }
}

/// A quote with its sync bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuoteRecord", into = "QuoteRecord")]
pub struct Quote {
    /// Identifier, expected but not guaranteed to be unique
    pub id: QuoteId,
    /// The quote itself
    pub text: String,
    /// Free-text grouping key
    pub category: String,
    /// ISO-8601 creation or update time
    ///
    /// Kept as text; it is only parsed when two records are compared.
    pub timestamp: String,
    /// Origin and sync state
    pub origin: QuoteOrigin,
}

impl Quote {
    /// Create a quote from user input
    ///
    /// Text is trimmed and must not be empty. A blank category becomes
    /// [`DEFAULT_CATEGORY`]; categories are lower-cased.
    pub fn new(text: &str, category: &str) -> Result<Self, QuoteError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QuoteError::EmptyText);
        }

        let category = match category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            c => c.to_lowercase(),
        };

        Ok(Self {
            id: QuoteId::generate(),
            text: text.to_string(),
            category,
            timestamp: now_iso(),
            origin: QuoteOrigin::default(),
        })
    }

    /// Create a quote with explicit fields (remote records, fixtures)
    pub fn with_id(
        id: impl Into<QuoteId>,
        text: impl Into<String>,
        category: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: category.into(),
            timestamp: timestamp.into(),
            origin: QuoteOrigin::default(),
        }
    }

    /// Parse the timestamp, if it is valid RFC 3339
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Record the remote has not acknowledged yet
    ///
    /// Records appended by a merge are never pushed.
    pub fn is_unsynced(&self) -> bool {
        matches!(
            self.origin,
            QuoteOrigin::Local { synced: false } | QuoteOrigin::ResolvedFromConflict { synced: false }
        )
    }

    /// Record that the remote accepted this quote
    ///
    /// Server-originated records carry no synced flag and are left alone.
    pub fn mark_synced(&mut self) {
        match &mut self.origin {
            QuoteOrigin::Local { synced } | QuoteOrigin::ResolvedFromConflict { synced } => {
                *synced = true
            }
            QuoteOrigin::ServerOriginated => {}
        }
    }

    /// Whether this record was appended by a merge
    pub fn is_from_server(&self) -> bool {
        self.origin == QuoteOrigin::ServerOriginated
    }

    /// Whether this record replaced a local one during a merge
    pub fn is_resolved(&self) -> bool {
        matches!(self.origin, QuoteOrigin::ResolvedFromConflict { .. })
    }

    /// Copy of this record with a different origin
    pub fn with_origin(mut self, origin: QuoteOrigin) -> Self {
        self.origin = origin;
        self
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.text, self.category)
    }
}

/// Current time in the format stored on quotes
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Serialized layout of a quote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRecord {
    text: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<QuoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    synced: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    from_server: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    resolved: bool,
}

impl From<QuoteRecord> for Quote {
    fn from(record: QuoteRecord) -> Self {
        let origin = if record.resolved {
            QuoteOrigin::ResolvedFromConflict {
                synced: record.synced,
            }
        } else if record.from_server {
            QuoteOrigin::ServerOriginated
        } else {
            QuoteOrigin::Local {
                synced: record.synced,
            }
        };

        Self {
            id: record.id.unwrap_or_else(QuoteId::generate),
            text: record.text,
            category: record.category,
            timestamp: record.timestamp.unwrap_or_else(now_iso),
            origin,
        }
    }
}

impl From<Quote> for QuoteRecord {
    fn from(quote: Quote) -> Self {
        let (synced, from_server, resolved) = match quote.origin {
            QuoteOrigin::Local { synced } => (synced, false, false),
            QuoteOrigin::ServerOriginated => (false, true, false),
            QuoteOrigin::ResolvedFromConflict { synced } => (synced, false, true),
        };

        Self {
            text: quote.text,
            category: quote.category,
            id: Some(quote.id),
            timestamp: Some(quote.timestamp),
            synced,
            from_server,
            resolved,
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_new() {
        let quote = Quote::new("  Stay hungry.  ", "Life").unwrap();
        assert_eq!(quote.text, "Stay hungry.");
        assert_eq!(quote.category, "life");
        assert!(quote.is_unsynced());
        assert!(quote.parsed_timestamp().is_some());
    }

    #[test]
    fn test_quote_new_default_category() {
        let quote = Quote::new("Stay foolish.", "   ").unwrap();
        assert_eq!(quote.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_quote_new_rejects_empty_text() {
        assert_eq!(Quote::new("   ", "life"), Err(QuoteError::EmptyText));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: Vec<QuoteId> = (0..100).map(|_| QuoteId::generate()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_server_id() {
        let id = QuoteId::server(7);
        assert_eq!(id, QuoteId::from("server_7"));
        assert!(id.is_server());
        assert!(!QuoteId::from(7i64).is_server());
        assert_eq!(id.to_string(), "server_7");
    }

    #[test]
    fn test_mark_synced() {
        let mut quote = Quote::new("Keep going.", "motivation").unwrap();
        quote.mark_synced();
        assert_eq!(quote.origin, QuoteOrigin::Local { synced: true });
        assert!(!quote.is_unsynced());

        let mut remote = Quote::with_id("server_1", "Remote", "server", now_iso())
            .with_origin(QuoteOrigin::ServerOriginated);
        remote.mark_synced();
        assert!(remote.is_from_server());
    }

    #[test]
    fn test_serialized_flags() {
        let quote = Quote::with_id(1i64, "A", "b", "2024-01-01T00:00:00.000Z");
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["id"], 1);
        assert!(json.get("synced").is_none());
        assert!(json.get("fromServer").is_none());

        let json = serde_json::to_value(quote.clone().with_origin(QuoteOrigin::ServerOriginated))
            .unwrap();
        assert_eq!(json["fromServer"], true);

        let json = serde_json::to_value(
            quote
                .clone()
                .with_origin(QuoteOrigin::ResolvedFromConflict { synced: false }),
        )
        .unwrap();
        assert_eq!(json["resolved"], true);
        assert!(json.get("fromServer").is_none());
        assert!(json.get("synced").is_none());

        let json =
            serde_json::to_value(quote.with_origin(QuoteOrigin::ResolvedFromConflict { synced: true }))
                .unwrap();
        assert_eq!(json["resolved"], true);
        assert_eq!(json["synced"], true);
    }

    #[test]
    fn test_resolved_record_sync_state() {
        let mut quote = Quote::with_id("server_1", "Remote", "server", now_iso())
            .with_origin(QuoteOrigin::ResolvedFromConflict { synced: false });
        assert!(quote.is_unsynced());

        quote.mark_synced();
        assert_eq!(quote.origin, QuoteOrigin::ResolvedFromConflict { synced: true });
        assert!(quote.is_resolved());
        assert!(!quote.is_unsynced());

        let restored: Quote = serde_json::from_str(&serde_json::to_string(&quote).unwrap()).unwrap();
        assert_eq!(restored.origin, QuoteOrigin::ResolvedFromConflict { synced: true });
    }

    #[test]
    fn test_deserialize_legacy_record() {
        let json = r#"{"text":"A","category":"b","id":1700000000000.5,"timestamp":"2024-01-01T00:00:00Z","synced":true}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.origin, QuoteOrigin::Local { synced: true });
        assert_eq!(quote.id.to_string(), "1700000000000.5");

        let json = r#"{"text":"A","category":"b","id":"server_1","fromServer":true,"resolved":true}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert!(quote.is_resolved());
        assert!(quote.is_unsynced());
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let quote: Quote = serde_json::from_str(r#"{"text":"A"}"#).unwrap();
        assert_eq!(quote.category, DEFAULT_CATEGORY);
        assert!(matches!(quote.id, QuoteId::Number(_)));
        assert!(quote.parsed_timestamp().is_some());
    }

    #[test]
    fn test_quote_serialization() {
        let quote = Quote::new("Serialize me", "test").unwrap();
        let json = serde_json::to_string(&quote).unwrap();
        let deserialized: Quote = serde_json::from_str(&json).unwrap();
        assert_eq!(quote, deserialized);
    }

    #[test]
    fn test_unparseable_timestamp() {
        let quote = Quote::with_id(1i64, "A", "b", "yesterday");
        assert!(quote.parsed_timestamp().is_none());
    }
}
