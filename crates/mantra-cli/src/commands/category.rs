//! Category command handlers

use anyhow::{Context, Result};

use mantra_core::store::ALL_CATEGORIES;
use mantra_core::QuoteStore;

use crate::output::Output;

/// List categories with counts, marking the selected one
pub fn list(store: &QuoteStore, output: &Output) -> Result<()> {
    output.print_categories(&store.categories_with_counts(), store.selected_category());
    Ok(())
}

/// Set the category filter
pub fn filter(store: &mut QuoteStore, category: &str, output: &Output) -> Result<()> {
    store
        .set_category_filter(category)
        .context("Failed to save category filter")?;

    let selected = store.selected_category().to_string();
    let count = store.filtered().len();

    if selected == ALL_CATEGORIES {
        output.success(&format!("Showing all categories ({} quotes)", count));
    } else if count == 0 {
        output.success(&format!("Filter set to '{}' (no quotes yet)", selected));
    } else {
        output.success(&format!("Filter set to '{}' ({} quotes)", selected, count));
    }

    Ok(())
}
