//! Quote command handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use mantra_core::{Config, Quote, QuoteStore, SyncEngine};

use super::{storage_failure, store_failure};
use crate::output::{print_json, Output, OutputFormat};
use crate::prompt::confirm;

/// Add a quote and, when sync is enabled, post it to the server
pub async fn add(
    mut store: QuoteStore,
    text: &str,
    category: &str,
    push: bool,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let quote = store
        .add_quote(text, category)
        .map_err(|e| store_failure(e, "Failed to add quote"))?;

    match output.format {
        OutputFormat::Json => print_json(&quote),
        OutputFormat::Quiet => println!("{}", quote.id),
        OutputFormat::Human => {
            output.success("Quote added successfully!");
            output.print_quote(&quote);
        }
    }

    if push && config.sync_enabled {
        let engine = SyncEngine::from_config(Arc::new(Mutex::new(store)), config)
            .context("Failed to set up the sync client")?;
        match engine.push_pending().await {
            Ok(report) if report.failed > 0 && !output.is_quiet() => {
                eprintln!(
                    "⚠ {} quote(s) could not be posted; they will be retried on the next sync",
                    report.failed
                );
            }
            Ok(_) => {}
            Err(e) => {
                if !output.is_quiet() {
                    eprintln!("⚠ Failed to save sync state: {}", e);
                }
            }
        }
    }

    Ok(())
}

/// Show a random quote from the selected category
pub fn random(store: &mut QuoteStore, output: &Output) -> Result<()> {
    match store.random_quote()? {
        Some(quote) => output.print_quote(&quote),
        None => output.message(&format!(
            "No quotes available in category '{}'.",
            store.selected_category()
        )),
    }
    Ok(())
}

/// List quotes, by the saved filter or an explicit category
pub fn list(store: &QuoteStore, category: Option<String>, output: &Output) -> Result<()> {
    let quotes: Vec<&Quote> = match category {
        Some(c) => {
            let c = store.canonical_category(&c);
            store.quotes().iter().filter(|q| q.category == c).collect()
        }
        None => store.filtered(),
    };

    output.print_quotes(&quotes);
    Ok(())
}

/// Search quotes
pub fn search(store: &QuoteStore, term: &str, output: &Output) -> Result<()> {
    output.print_quotes(&store.search(term));
    Ok(())
}

/// Show collection statistics
pub fn stats(store: &QuoteStore, output: &Output) -> Result<()> {
    let stats = store.stats();

    match output.format {
        OutputFormat::Json => print_json(&stats),
        OutputFormat::Quiet => println!("{}", stats.total),
        OutputFormat::Human => {
            println!("Quotes:         {}", stats.total);
            println!("Categories:     {}", stats.categories);
            println!("Average length: {:.0} characters", stats.average_length);
        }
    }

    Ok(())
}

/// Remove every quote
pub fn clear(store: &mut QuoteStore, yes: bool, output: &Output) -> Result<()> {
    if !yes
        && output.should_prompt()
        && !confirm(
            "Are you sure you want to clear all quotes? This action cannot be undone.",
        )?
    {
        println!("Cancelled.");
        return Ok(());
    }

    store
        .clear()
        .map_err(|e| storage_failure(e, "Failed to clear quotes"))?;
    output.success("All quotes cleared.");

    Ok(())
}
