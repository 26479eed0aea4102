//! Observation history listing.

use crate::cli::output;
use crate::config::Settings;
use crate::store::ObservationStore;
use anyhow::{Context, Result};

/// `pricewatch history`.
pub fn run(settings: &Settings, product: Option<&str>, limit: Option<usize>) -> Result<()> {
    let store = ObservationStore::open(&settings.db_path)
        .with_context(|| format!("failed to open {}", settings.db_path.display()))?;
    let history = store.list_history(product, limit)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({ "history": history }));
        return Ok(());
    }

    if history.is_empty() {
        println!("  No price history yet. Run `pricewatch check` to start tracking.");
        return Ok(());
    }

    let width = history
        .iter()
        .map(|o| o.product_name.chars().count())
        .max()
        .unwrap_or(0);
    for o in &history {
        println!(
            "  {}  {:<width$}  {:>10}",
            o.observed_at.format("%Y-%m-%d %H:%M"),
            o.product_name,
            o.price.to_string()
        );
    }
    Ok(())
}
