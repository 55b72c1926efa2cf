//! Export and import command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use mantra_core::transfer::{export_category_file_name, export_file_name};
use mantra_core::QuoteStore;

use super::store_failure;
use crate::output::{print_json, Output, OutputFormat};

/// Write quotes to a JSON file
pub fn export(
    store: &QuoteStore,
    path: Option<PathBuf>,
    category: Option<String>,
    output: &Output,
) -> Result<()> {
    let today = Local::now().date_naive();

    let (json, default_name) = match category.as_deref() {
        Some(c) => (
            store.export_category_json(c),
            export_category_file_name(c, today),
        ),
        None => (store.export_json(), export_file_name(today)),
    };
    let json = json.context("Error exporting quotes.")?;
    let path = path.unwrap_or_else(|| PathBuf::from(default_name));

    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write export file: {:?}", path))?;

    match output.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "success",
            "file": path,
        })),
        OutputFormat::Quiet => println!("{}", path.display()),
        OutputFormat::Human => {
            output.success(&format!("Quotes exported successfully to {}", path.display()))
        }
    }

    Ok(())
}

/// Append quotes from a JSON file
pub fn import(store: &mut QuoteStore, file: &Path, output: &Output) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Error reading file: {:?}", file))?;

    let report = store
        .import_json(&content)
        .map_err(|e| store_failure(e, "Error importing quotes"))?;

    match output.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Quiet => println!("{}", report.imported),
        OutputFormat::Human => {
            output.success(&format!(
                "Successfully imported {} quotes!",
                report.imported
            ));
            if report.rejected > 0 {
                output.message(&format!(
                    "  Skipped {} invalid entries",
                    report.rejected
                ));
            }
        }
    }

    Ok(())
}
