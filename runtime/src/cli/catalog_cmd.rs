//! Show the configured catalog.

use crate::cli::output;
use crate::config::Settings;
use anyhow::{Context, Result};

/// `pricewatch catalog`.
pub fn run(settings: &Settings) -> Result<()> {
    let catalog = settings.load_catalog().context("failed to load catalog")?;

    if output::is_json() {
        output::print_json(&serde_json::json!({ "products": catalog }));
        return Ok(());
    }

    let source = settings
        .catalog_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    println!("  Catalog ({source}), {} products:\n", catalog.len());
    for product in &catalog {
        println!("  {:<12} {}", product.key, product.display_name);
        println!("  {:<12} {}", "", product.url);
    }
    Ok(())
}
