//! Bulk JSON import and export
//!
//! Export writes the collection as a pretty-printed JSON array. Import is
//! lenient: entries without string `text` and `category` are dropped and
//! only counted, never reported one by one.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::models::{now_iso, Quote, QuoteId, QuoteOrigin};

/// Errors that reject an import as a whole
#[derive(Error, Debug)]
pub enum ImportError {
    /// The document is not JSON at all
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The document is JSON but not an array
    #[error("Invalid file format. Expected an array of quotes.")]
    NotAnArray,

    /// Every entry was rejected
    #[error("No valid quotes found in the imported file.")]
    NoValidQuotes,
}

/// Result of parsing an import document
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Entries that passed validation, with ids and timestamps filled in
    pub quotes: Vec<Quote>,
    /// Number of entries dropped
    pub rejected: usize,
}

/// Serialize quotes as a pretty-printed JSON array
pub fn export(quotes: &[Quote]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(quotes)
}

/// Serialize only the quotes in `category`
pub fn export_category(quotes: &[Quote], category: &str) -> serde_json::Result<String> {
    let selected: Vec<&Quote> = quotes.iter().filter(|q| q.category == category).collect();
    serde_json::to_string_pretty(&selected)
}

/// Default file name for a full export
pub fn export_file_name(date: NaiveDate) -> String {
    format!("quotes-export-{}.json", date.format("%Y-%m-%d"))
}

/// Default file name for a single-category export
pub fn export_category_file_name(category: &str, date: NaiveDate) -> String {
    format!("quotes-{}-{}.json", category, date.format("%Y-%m-%d"))
}

/// Parse an import document
///
/// The document must be a JSON array. Entries must be objects with string
/// `text` and `category`; everything else is dropped. Missing or empty ids
/// and timestamps are generated. Provided ids, timestamps and sync flags
/// are kept.
pub fn import(content: &str) -> Result<ImportOutcome, ImportError> {
    let document: Value = serde_json::from_str(content)?;
    let Value::Array(entries) = document else {
        return Err(ImportError::NotAnArray);
    };

    let total = entries.len();
    let quotes: Vec<Quote> = entries.iter().filter_map(parse_entry).collect();

    if quotes.is_empty() {
        return Err(ImportError::NoValidQuotes);
    }

    Ok(ImportOutcome {
        rejected: total - quotes.len(),
        quotes,
    })
}

/// Convert one entry, or `None` if it is not a usable quote
fn parse_entry(entry: &Value) -> Option<Quote> {
    let text = entry.get("text")?.as_str()?;
    let category = entry.get("category")?.as_str()?;

    let id = match entry.get("id") {
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => QuoteId::Number(n.clone()),
        Some(Value::String(s)) if !s.is_empty() => QuoteId::Text(s.clone()),
        _ => QuoteId::generate(),
    };

    let timestamp = match entry.get("timestamp") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => now_iso(),
    };

    let flag = |name: &str| entry.get(name).and_then(Value::as_bool).unwrap_or(false);
    let origin = if flag("resolved") {
        QuoteOrigin::ResolvedFromConflict {
            synced: flag("synced"),
        }
    } else if flag("fromServer") {
        QuoteOrigin::ServerOriginated
    } else {
        QuoteOrigin::Local {
            synced: flag("synced"),
        }
    };

    Some(Quote::with_id(id, text, category, timestamp).with_origin(origin))
}
