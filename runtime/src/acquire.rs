//! Acquisition orchestrator — one session, every catalog product, bounded retries.
//!
//! Each product moves through `Pending → Attempting(n) → Succeeded | Exhausted`.
//! An attempt navigates to the product page, bootstraps the session on the first
//! page it reaches, and runs the extractor. Failures are retried in place up to
//! `max_attempts`; an exhausted product is reported and the run moves on.

use crate::catalog::{Catalog, Product};
use crate::error::{AcquireError, FailureKind};
use crate::extract::{default_strategies, Extraction, PriceExtractor};
use crate::gate::Observation;
use crate::price::Price;
use crate::renderer::Renderer;
use crate::session::{BootstrapReport, PageSession, SessionConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Default retry budget per product.
pub const MAX_ATTEMPTS: u32 = 3;

/// Limits for one acquisition run.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub max_attempts: u32,
    /// Per-strategy element wait.
    pub element_timeout: Duration,
    pub session: SessionConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            element_timeout: Duration::from_secs(10),
            session: SessionConfig::default(),
        }
    }
}

/// Retry state of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductState {
    Pending,
    Attempting(u32),
    Succeeded(Price),
    Exhausted,
}

impl ProductState {
    /// Transition after attempt `n` finished with `result`.
    pub fn after_attempt(n: u32, result: &Result<Price, AcquireError>, max_attempts: u32) -> Self {
        match result {
            Ok(price) => Self::Succeeded(*price),
            Err(_) if n < max_attempts => Self::Attempting(n + 1),
            Err(_) => Self::Exhausted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Exhausted)
    }
}

/// Outcome of a single extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { price: Price },
    NavigationTimeout,
    NotFound,
    ParseError { detail: String },
}

/// One attempt at one product, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionAttempt {
    pub product_key: String,
    pub attempt_number: u32,
    /// Winning strategy; `None` unless the attempt succeeded.
    pub selector_used: Option<String>,
    pub outcome: AttemptOutcome,
    pub finished_at: DateTime<Utc>,
}

/// A product that exhausted its attempts.
#[derive(Debug, Clone, Serialize)]
pub struct ProductFailure {
    pub product_key: String,
    pub product_name: String,
    pub attempts: u32,
    pub kind: FailureKind,
    pub message: String,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Successful observations in catalog order.
    pub observations: Vec<Observation>,
    pub failures: Vec<ProductFailure>,
    pub attempts: Vec<ExtractionAttempt>,
    pub bootstrap: Option<BootstrapReport>,
}

/// Drives one browsing session across the whole catalog.
pub struct Acquisition {
    renderer: Arc<dyn Renderer>,
    catalog: Arc<Catalog>,
    extractor: PriceExtractor,
    config: AcquisitionConfig,
}

impl Acquisition {
    pub fn new(renderer: Arc<dyn Renderer>, catalog: Arc<Catalog>, config: AcquisitionConfig) -> Self {
        let extractor = PriceExtractor::new(default_strategies(), config.element_timeout);
        Self {
            renderer,
            catalog,
            extractor,
            config,
        }
    }

    /// Visit every product once and return the observations that succeeded.
    ///
    /// Fails only when the browser session cannot be started. The session is
    /// closed exactly once before returning.
    pub async fn run(&self) -> Result<RunReport, AcquireError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunReport, AcquireError> {
        let started_at = Utc::now();
        info!(products = self.catalog.len(), "acquisition started");

        let context = self
            .renderer
            .launch()
            .await
            .map_err(|e| AcquireError::SessionInit(format!("{e:#}")))?;
        let mut session = PageSession::new(context, self.config.session.clone());

        let mut report = RunReport {
            run_id,
            started_at,
            finished_at: started_at,
            observations: Vec::new(),
            failures: Vec::new(),
            attempts: Vec::new(),
            bootstrap: None,
        };

        for product in self.catalog.iter() {
            self.acquire_product(&mut session, product, &mut report).await;
        }

        report.bootstrap = session.bootstrap_report().cloned();
        if let Err(e) = session.close().await {
            warn!("failed to close browser session: {e:#}");
        }

        report.finished_at = Utc::now();
        info!(
            succeeded = report.observations.len(),
            failed = report.failures.len(),
            "acquisition finished"
        );
        Ok(report)
    }

    async fn acquire_product(
        &self,
        session: &mut PageSession,
        product: &Product,
        report: &mut RunReport,
    ) {
        let mut state = ProductState::Pending;
        let mut last_error: Option<AcquireError> = None;
        let mut succeeded_at: Option<DateTime<Utc>> = None;

        loop {
            state = match state {
                ProductState::Pending => ProductState::Attempting(1),
                ProductState::Attempting(n) => {
                    let result = self.attempt(session, product).await;
                    let finished_at = Utc::now();
                    report
                        .attempts
                        .push(attempt_record(product, n, &result, finished_at));
                    let priced = result.map(|extraction| {
                        debug!(
                            product = %product.key,
                            strategy = %extraction.strategy,
                            raw = %extraction.raw,
                            "price text read"
                        );
                        succeeded_at = Some(finished_at);
                        extraction.price
                    });
                    let next = ProductState::after_attempt(n, &priced, self.config.max_attempts);
                    if let Err(e) = priced {
                        debug!(product = %product.key, attempt = n, error = %e, "attempt failed");
                        last_error = Some(e);
                    }
                    next
                }
                ProductState::Succeeded(price) => {
                    info!(product = %product.key, %price, "price acquired");
                    report
                        .observations
                        .push(Observation::new(
                            &product.display_name,
                            price,
                            succeeded_at.unwrap_or_else(Utc::now),
                        ));
                    return;
                }
                ProductState::Exhausted => {
                    let error = last_error.unwrap_or(AcquireError::NotFound);
                    warn!(product = %product.key, error = %error, "giving up on product");
                    report.failures.push(ProductFailure {
                        product_key: product.key.clone(),
                        product_name: product.display_name.clone(),
                        attempts: self.config.max_attempts,
                        kind: error.kind().unwrap_or(FailureKind::NotFound),
                        message: error.to_string(),
                    });
                    return;
                }
            };
        }
    }

    async fn attempt(
        &self,
        session: &mut PageSession,
        product: &Product,
    ) -> Result<Extraction, AcquireError> {
        session.open(&product.url).await?;
        session.ensure_bootstrap().await;
        self.extractor.extract(session).await
    }
}

fn attempt_record(
    product: &Product,
    attempt_number: u32,
    result: &Result<Extraction, AcquireError>,
    finished_at: DateTime<Utc>,
) -> ExtractionAttempt {
    let (selector_used, outcome) = match result {
        Ok(extraction) => (
            Some(extraction.strategy.clone()),
            AttemptOutcome::Success {
                price: extraction.price,
            },
        ),
        Err(AcquireError::NavigationTimeout { .. }) => (None, AttemptOutcome::NavigationTimeout),
        Err(AcquireError::Parse(e)) => (
            None,
            AttemptOutcome::ParseError {
                detail: e.to_string(),
            },
        ),
        Err(_) => (None, AttemptOutcome::NotFound),
    };
    ExtractionAttempt {
        product_key: product.key.clone(),
        attempt_number,
        selector_used,
        outcome,
        finished_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let ok: Result<Price, AcquireError> = Ok(Price::from_cents(100));
        let err: Result<Price, AcquireError> = Err(AcquireError::NotFound);

        assert_eq!(
            ProductState::after_attempt(1, &ok, 3),
            ProductState::Succeeded(Price::from_cents(100))
        );
        assert_eq!(ProductState::after_attempt(1, &err, 3), ProductState::Attempting(2));
        assert_eq!(ProductState::after_attempt(2, &err, 3), ProductState::Attempting(3));
        assert_eq!(ProductState::after_attempt(3, &err, 3), ProductState::Exhausted);
        assert_eq!(ProductState::after_attempt(1, &err, 1), ProductState::Exhausted);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ProductState::Pending.is_terminal());
        assert!(!ProductState::Attempting(2).is_terminal());
        assert!(ProductState::Exhausted.is_terminal());
        assert!(ProductState::Succeeded(Price::from_cents(1)).is_terminal());
    }

    #[test]
    fn test_attempt_record_classifies_errors() {
        let product = Product::new("a", "A", "https://shop.test/a");
        let nav = Err(AcquireError::NavigationTimeout {
            url: product.url.clone(),
            detail: "slow".into(),
        });
        assert_eq!(
            attempt_record(&product, 1, &nav, Utc::now()).outcome,
            AttemptOutcome::NavigationTimeout
        );

        let ok = Ok(Extraction {
            price: Price::from_cents(250),
            strategy: "aggregate".into(),
            raw: "2,50 €".into(),
        });
        let record = attempt_record(&product, 2, &ok, Utc::now());
        assert_eq!(record.selector_used.as_deref(), Some("aggregate"));
        assert_eq!(record.attempt_number, 2);
    }
}
