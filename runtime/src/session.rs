//! Page session controller.
//!
//! Owns the single browsing session of a run. Navigation failures surface as
//! [`AcquireError::NavigationTimeout`]; consent and delivery-locale setup are
//! best-effort and reported as [`BootstrapOutcome`] values, never as errors.

use crate::error::AcquireError;
use crate::renderer::{NavigationResult, RenderContext, WaitCondition};
use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Cookie banner "accept" button.
pub const CONSENT_ACCEPT: &str = "#sp-cc-accept";
/// Header link opening the delivery-location popover.
pub const LOCATION_LINK: &str = "#nav-global-location-popover-link";
/// Postal code input inside the popover.
pub const POSTAL_CODE_INPUT: &str = "#GLUXZipUpdateInput";
/// "Apply" button inside the popover.
pub const POSTAL_CODE_APPLY: &str = "#GLUXZipUpdate";

/// Selectors and limits for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub navigation_timeout: Duration,
    pub bootstrap_timeout: Duration,
    pub settle_delay: Duration,
    pub postal_code: String,
    pub consent_accept: String,
    pub location_link: String,
    pub postal_code_input: String,
    pub postal_code_apply: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            bootstrap_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
            postal_code: "94310".to_string(),
            consent_accept: CONSENT_ACCEPT.to_string(),
            location_link: LOCATION_LINK.to_string(),
            postal_code_input: POSTAL_CODE_INPUT.to_string(),
            postal_code_apply: POSTAL_CODE_APPLY.to_string(),
        }
    }
}

/// Result of one best-effort bootstrap step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BootstrapOutcome {
    Applied,
    NotApplicable { reason: String },
}

impl BootstrapOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    fn from_step(step: Result<()>) -> Self {
        match step {
            Ok(()) => Self::Applied,
            Err(e) => Self::NotApplicable {
                reason: format!("{e:#}"),
            },
        }
    }
}

/// Outcome of the one-time session bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub consent: BootstrapOutcome,
    pub locale: BootstrapOutcome,
}

/// Bootstrap flags; each is set at most once per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub consent_dismissed: bool,
    pub locale_configured: bool,
}

/// One exclusively owned browsing session.
pub struct PageSession {
    context: Box<dyn RenderContext>,
    config: SessionConfig,
    state: SessionState,
    bootstrap: Option<BootstrapReport>,
}

impl PageSession {
    pub fn new(context: Box<dyn RenderContext>, config: SessionConfig) -> Self {
        Self {
            context,
            config,
            state: SessionState::default(),
            bootstrap: None,
        }
    }

    /// Navigate to `url` and wait for the page to be ready.
    pub async fn open(&mut self, url: &str) -> Result<NavigationResult, AcquireError> {
        let nav = self
            .context
            .navigate(url, self.config.navigation_timeout)
            .await
            .map_err(|e| AcquireError::NavigationTimeout {
                url: url.to_string(),
                detail: format!("{e:#}"),
            })?;
        if nav.final_url != url {
            debug!(url, final_url = %nav.final_url, "navigation redirected");
        }
        debug!(url, load_ms = nav.load_time_ms, "page ready");
        Ok(nav)
    }

    /// Dismiss the consent overlay and set the delivery locale, once per session.
    ///
    /// The first call performs both steps against the current page; later calls
    /// return the first call's report without touching the page.
    pub async fn ensure_bootstrap(&mut self) -> BootstrapReport {
        if let Some(report) = &self.bootstrap {
            return report.clone();
        }

        let consent = BootstrapOutcome::from_step(self.dismiss_consent().await);
        self.state.consent_dismissed = consent.is_applied();
        log_step("consent", &consent);

        let locale = BootstrapOutcome::from_step(self.configure_locale().await);
        self.state.locale_configured = locale.is_applied();
        log_step("locale", &locale);

        let report = BootstrapReport { consent, locale };
        self.bootstrap = Some(report.clone());
        report
    }

    /// Whether [`ensure_bootstrap`](Self::ensure_bootstrap) has already run.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrap.is_some()
    }

    pub fn bootstrap_report(&self) -> Option<&BootstrapReport> {
        self.bootstrap.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &dyn RenderContext {
        self.context.as_ref()
    }

    /// Release the browser.
    pub async fn close(self) -> Result<()> {
        self.context.close().await
    }

    async fn dismiss_consent(&self) -> Result<()> {
        let cfg = &self.config;
        if !self
            .context
            .wait_for(&cfg.consent_accept, WaitCondition::Present, cfg.bootstrap_timeout)
            .await?
        {
            bail!("no consent banner");
        }
        self.context.click(&cfg.consent_accept).await?;
        self.settle().await;
        Ok(())
    }

    async fn configure_locale(&self) -> Result<()> {
        let cfg = &self.config;
        self.wait_until(&cfg.location_link, WaitCondition::Clickable)
            .await?;
        self.context.click(&cfg.location_link).await?;
        self.settle().await;

        self.wait_until(&cfg.postal_code_input, WaitCondition::Present)
            .await?;
        self.context
            .fill(&cfg.postal_code_input, &cfg.postal_code)
            .await?;

        self.wait_until(&cfg.postal_code_apply, WaitCondition::Clickable)
            .await?;
        self.context.click(&cfg.postal_code_apply).await?;
        self.settle().await;
        Ok(())
    }

    async fn wait_until(&self, selector: &str, condition: WaitCondition) -> Result<()> {
        if !self
            .context
            .wait_for(selector, condition, self.config.bootstrap_timeout)
            .await?
        {
            bail!("{selector} not {condition:?} within {:?}", self.config.bootstrap_timeout);
        }
        Ok(())
    }

    async fn settle(&self) {
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
    }
}

fn log_step(step: &str, outcome: &BootstrapOutcome) {
    match outcome {
        BootstrapOutcome::Applied => info!(step, "bootstrap applied"),
        BootstrapOutcome::NotApplicable { reason } => {
            info!(step, %reason, "bootstrap not applied")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scripted::{PageOutcome, PageSnapshot, ScriptedRenderer};
    use crate::renderer::Renderer;

    const URL: &str = "https://shop.test/p";

    fn config() -> SessionConfig {
        SessionConfig {
            settle_delay: Duration::ZERO,
            postal_code: "75001".into(),
            ..SessionConfig::default()
        }
    }

    fn full_page() -> PageSnapshot {
        PageSnapshot::new()
            .with_button(CONSENT_ACCEPT)
            .with_button(LOCATION_LINK)
            .with_button(POSTAL_CODE_INPUT)
            .with_button(POSTAL_CODE_APPLY)
    }

    async fn session_on(renderer: &ScriptedRenderer) -> PageSession {
        let ctx = renderer.launch().await.unwrap();
        PageSession::new(ctx, config())
    }

    #[tokio::test]
    async fn test_bootstrap_applies_both_steps_once() {
        let renderer =
            ScriptedRenderer::new().with_page(URL, vec![PageOutcome::Loaded(full_page())]);
        let mut session = session_on(&renderer).await;
        session.open(URL).await.unwrap();

        let report = session.ensure_bootstrap().await;
        assert!(report.consent.is_applied());
        assert!(report.locale.is_applied());
        assert_eq!(
            session.state(),
            SessionState {
                consent_dismissed: true,
                locale_configured: true
            }
        );

        // Second call is a no-op.
        session.open(URL).await.unwrap();
        assert_eq!(session.ensure_bootstrap().await, report);

        let log = renderer.log();
        assert_eq!(
            log.clicks,
            vec![CONSENT_ACCEPT, LOCATION_LINK, POSTAL_CODE_APPLY]
        );
        assert_eq!(
            log.fills,
            vec![(POSTAL_CODE_INPUT.to_string(), "75001".to_string())]
        );
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_widgets_are_not_errors() {
        let renderer = ScriptedRenderer::new()
            .with_page(URL, vec![PageOutcome::Loaded(PageSnapshot::new())]);
        let mut session = session_on(&renderer).await;
        session.open(URL).await.unwrap();

        let report = session.ensure_bootstrap().await;
        assert!(matches!(report.consent, BootstrapOutcome::NotApplicable { .. }));
        assert!(matches!(report.locale, BootstrapOutcome::NotApplicable { .. }));
        assert_eq!(session.state(), SessionState::default());
        assert!(session.is_bootstrapped());
        assert!(renderer.log().clicks.is_empty());
    }

    #[tokio::test]
    async fn test_locale_without_consent_banner() {
        let page = PageSnapshot::new()
            .with_button(LOCATION_LINK)
            .with_button(POSTAL_CODE_INPUT)
            .with_button(POSTAL_CODE_APPLY);
        let renderer = ScriptedRenderer::new().with_page(URL, vec![PageOutcome::Loaded(page)]);
        let mut session = session_on(&renderer).await;
        session.open(URL).await.unwrap();

        let report = session.ensure_bootstrap().await;
        assert!(!report.consent.is_applied());
        assert!(report.locale.is_applied());
    }

    #[tokio::test]
    async fn test_navigation_failure_is_navigation_timeout() {
        let renderer = ScriptedRenderer::new().with_page(URL, vec![PageOutcome::TimedOut]);
        let mut session = session_on(&renderer).await;
        let err = session.open(URL).await.unwrap_err();
        assert!(matches!(err, AcquireError::NavigationTimeout { url, .. } if url == URL));
    }
}
