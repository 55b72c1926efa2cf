//! Command handlers

pub mod category;
pub mod config;
pub mod quote;
pub mod status;
pub mod sync;
pub mod transfer;

use mantra_core::{StorageError, StoreError};

/// Wrap a storage failure, adding its recovery hint to the message
pub fn storage_failure(error: StorageError, action: &str) -> anyhow::Error {
    let message = match error.recovery_suggestion() {
        Some(hint) => format!("{}. {}", action, hint),
        None => action.to_string(),
    };
    anyhow::Error::new(error).context(message)
}

/// Like [`storage_failure`], for errors that may not come from storage
pub fn store_failure(error: StoreError, action: &str) -> anyhow::Error {
    match error {
        StoreError::Storage(e) => storage_failure(e, action),
        other => anyhow::Error::new(other).context(action.to_string()),
    }
}
