//! Timed check loop.
//!
//! Cycles run back to back on a fixed period and never overlap: the next tick
//! is only awaited after the previous cycle's browser session has closed.

use crate::cli::check_cmd;
use crate::cli::output;
use crate::config::Settings;
use anyhow::{Context, Result};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// `pricewatch watch`.
pub async fn run(settings: &Settings, interval: Duration, dry_run: bool) -> Result<()> {
    let catalog = Arc::new(settings.load_catalog().context("failed to load catalog")?);

    info!(
        interval_secs = interval.as_secs(),
        products = catalog.len(),
        "watch loop started"
    );
    if !output::is_quiet() && !output::is_json() {
        eprintln!(
            "  Checking {} products every {}s. Press Ctrl-C to stop.",
            catalog.len(),
            interval.as_secs()
        );
    }

    let cycles = watch_loop(interval, tokio::signal::ctrl_c(), |cycle| {
        let catalog = Arc::clone(&catalog);
        async move {
            match check_cmd::run_cycle(settings, catalog, dry_run).await {
                Ok(outcome) => check_cmd::print_outcome(&outcome),
                // A failed cycle (e.g. the browser would not start) waits for the next tick.
                Err(e) => warn!(cycle, "check cycle failed: {e:#}"),
            }
        }
    })
    .await;

    info!(cycles, "watch loop stopped");
    Ok(())
}

/// Run `cycle` on every tick until `shutdown` resolves; returns the number of cycles run.
///
/// A running cycle is never interrupted. A shutdown signalled while it runs is
/// honoured as soon as it finishes.
pub async fn watch_loop<S, F, Fut>(interval: Duration, shutdown: S, mut cycle: F) -> u64
where
    S: Future,
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                cycles = cycles.saturating_add(1);
                cycle(cycles).await;
                if (&mut shutdown).now_or_never().is_some() {
                    break;
                }
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_shutdown_during_cycle_stops_after_it() {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));

        let cycles = watch_loop(Duration::from_millis(1), rx, |_| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            async {}
        })
        .await;

        assert_eq!(cycles, 1);
    }

    #[tokio::test]
    async fn test_cycles_repeat_until_shutdown() {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));

        let cycles = watch_loop(Duration::from_millis(1), rx, |n| {
            if n == 3 {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }
            async {}
        })
        .await;

        assert_eq!(cycles, 3);
    }
}
