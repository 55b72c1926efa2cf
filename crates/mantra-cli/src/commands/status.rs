//! Status command handler

use anyhow::Result;
use chrono::Local;

use mantra_core::{Config, QuoteStore};

use crate::output::{print_json, Output, OutputFormat};

/// Show status information
pub fn show(store: &QuoteStore, config: &Config, output: &Output) -> Result<()> {
    let pending = store.unsynced().len();
    let last_sync = store.last_sync_time();
    let last_modified = store.last_modified();

    match output.format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "quotes": store.len(),
                "categories": store.categories().len(),
                "selected_category": store.selected_category(),
                "pending_push": pending,
                "last_sync": last_sync,
                "last_modified": last_modified,
                "sync_enabled": config.sync_enabled,
                "api_url": config.api_url,
                "sync_interval_secs": config.sync_interval().as_secs(),
                "data_dir": config.data_dir,
            }));
        }
        OutputFormat::Quiet => {
            println!("{}", store.len());
        }
        OutputFormat::Human => {
            println!("Mantra Status");
            println!("=============");
            println!();
            println!("Collection:");
            println!("  Quotes:     {}", store.len());
            println!("  Categories: {}", store.categories().len());
            println!("  Filter:     {}", store.selected_category());
            println!(
                "  Modified:   {}",
                last_modified.as_deref().unwrap_or("never")
            );
            println!();
            println!("Sync:");
            println!(
                "  Status:    {}",
                if config.sync_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("  Server:    {}", config.api_url);
            println!("  Interval:  {}s", config.sync_interval().as_secs());
            println!("  Pending:   {} quote(s) not yet posted", pending);
            println!(
                "  Last sync: {}",
                last_sync
                    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string())
            );
            println!();
            println!("Storage:");
            println!("  Location: {}", config.storage_dir().display());
        }
    }

    Ok(())
}
