//! Current prices and basket total.

use crate::cli::output::{self, Styled};
use crate::config::Settings;
use crate::price::Price;
use crate::store::{LatestPrice, ObservationStore};
use anyhow::{Context, Result};

/// Sum of the latest prices.
pub fn basket_total(latest: &[LatestPrice]) -> Price {
    Price::from_cents(latest.iter().map(|l| l.price.cents()).sum())
}

/// `pricewatch latest`.
pub fn run(settings: &Settings) -> Result<()> {
    let store = ObservationStore::open(&settings.db_path)
        .with_context(|| format!("failed to open {}", settings.db_path.display()))?;
    let latest = store.latest_prices()?;
    let total = basket_total(&latest);

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "latest": latest,
            "total": total,
        }));
        return Ok(());
    }

    if latest.is_empty() {
        println!("  No prices recorded yet. Run `pricewatch check` to start tracking.");
        return Ok(());
    }

    let s = Styled::new();
    let width = latest
        .iter()
        .map(|l| l.product_name.chars().count())
        .max()
        .unwrap_or(0);
    for l in &latest {
        println!(
            "  {:<width$}  {:>10}  since {}",
            l.product_name,
            l.price.to_string(),
            l.observed_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    println!("  {} {}", s.bold("Basket total:"), total);
    Ok(())
}
