//! One check cycle: acquire every price, gate, persist, report.

use crate::acquire::{Acquisition, AcquisitionConfig, RunReport};
use crate::catalog::Catalog;
use crate::cli::output::{self, Styled};
use crate::config::Settings;
use crate::gate::{self, Observation};
use crate::renderer::chromium::{ChromiumOptions, ChromiumRenderer};
use crate::renderer::Renderer;
use crate::store::ObservationStore;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Result of one check cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub report: RunReport,
    /// Observations written (or that would be written on a dry run).
    pub persisted: Vec<Observation>,
    pub unchanged: Vec<Observation>,
    pub dry_run: bool,
}

/// Run one acquisition and hand its observations to the change gate.
///
/// A session that cannot start fails the cycle; per-product failures do not.
pub async fn check_once(
    renderer: Arc<dyn Renderer>,
    catalog: Arc<Catalog>,
    config: AcquisitionConfig,
    store: &mut ObservationStore,
    dry_run: bool,
) -> Result<CheckOutcome> {
    store
        .register_catalog(&catalog)
        .context("failed to register catalog products")?;

    let acquisition = Acquisition::new(renderer, catalog, config);
    let report = acquisition.run().await?;

    let (persisted, unchanged) = if dry_run {
        gate::partition_changed(&*store, report.observations.clone())?
    } else {
        let outcome = store.persist_changed(report.observations.clone())?;
        (outcome.persisted, outcome.unchanged)
    };

    info!(
        persisted = persisted.len(),
        unchanged = unchanged.len(),
        failed = report.failures.len(),
        dry_run,
        "check cycle complete"
    );

    Ok(CheckOutcome {
        report,
        persisted,
        unchanged,
        dry_run,
    })
}

/// Build the production renderer and store, then run one cycle.
pub async fn run_cycle(settings: &Settings, catalog: Arc<Catalog>, dry_run: bool) -> Result<CheckOutcome> {
    let renderer: Arc<dyn Renderer> =
        Arc::new(ChromiumRenderer::new(ChromiumOptions::from_settings(settings)));
    let mut store = ObservationStore::open(&settings.db_path)
        .with_context(|| format!("failed to open {}", settings.db_path.display()))?;
    check_once(
        renderer,
        catalog,
        settings.acquisition_config(),
        &mut store,
        dry_run,
    )
    .await
}

/// `pricewatch check`.
pub async fn run(settings: &Settings, dry_run: bool) -> Result<()> {
    let catalog = Arc::new(settings.load_catalog().context("failed to load catalog")?);
    let outcome = run_cycle(settings, catalog, dry_run).await?;
    print_outcome(&outcome);
    Ok(())
}

/// Print a cycle's result in the selected output mode.
pub fn print_outcome(outcome: &CheckOutcome) {
    if output::is_json() {
        match serde_json::to_value(outcome) {
            Ok(value) => output::print_json(&value),
            Err(e) => eprintln!("  failed to encode result: {e}"),
        }
        return;
    }
    if output::is_quiet() {
        return;
    }

    let s = Styled::new();
    let width = outcome
        .report
        .observations
        .iter()
        .map(|o| o.product_name.chars().count())
        .chain(outcome.report.failures.iter().map(|f| f.product_name.chars().count()))
        .max()
        .unwrap_or(0);

    let verb = if outcome.dry_run { "would record" } else { "recorded" };
    for o in &outcome.persisted {
        println!("  {} {:<width$}  {:>10}  {verb}", s.ok_sym(), o.product_name, o.price.to_string());
    }
    for o in &outcome.unchanged {
        println!("  {} {:<width$}  {:>10}  unchanged", s.same_sym(), o.product_name, o.price.to_string());
    }
    for f in &outcome.report.failures {
        println!(
            "  {} {:<width$}  failed after {} attempts: {}",
            s.err_sym(),
            f.product_name,
            f.attempts,
            f.message
        );
    }
    println!();
    println!(
        "  {} {} {verb}, {} unchanged, {} failed",
        s.bold("Summary:"),
        outcome.persisted.len(),
        outcome.unchanged.len(),
        outcome.report.failures.len()
    );
}
