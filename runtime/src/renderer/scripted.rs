//! In-memory renderer that replays scripted page snapshots.
//!
//! Each URL maps to a sequence of outcomes, one per navigation: the first visit
//! sees the first outcome, the second visit the second, and so on (the last one
//! repeats). Every interaction is recorded in a shared [`ScriptLog`].

use super::{NavigationResult, RenderContext, Renderer, WaitCondition};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An element on a scripted page.
#[derive(Debug, Clone, Default)]
pub struct ScriptedElement {
    pub text: Option<String>,
    pub attributes: HashMap<String, String>,
    pub clickable: bool,
}

/// The DOM of a scripted page, keyed by exact selector string.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    elements: HashMap<String, ScriptedElement>,
}

impl PageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a non-interactive element with text content.
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.elements.entry(selector.to_string()).or_default().text = Some(text.to_string());
        self
    }

    pub fn with_attribute(mut self, selector: &str, name: &str, value: &str) -> Self {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Add a clickable element (button, link, or input).
    pub fn with_button(mut self, selector: &str) -> Self {
        self.elements.entry(selector.to_string()).or_default().clickable = true;
        self
    }

    fn get(&self, selector: &str) -> Option<&ScriptedElement> {
        self.elements.get(selector)
    }
}

/// Outcome of one scripted navigation.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Loaded(PageSnapshot),
    TimedOut,
}

/// Everything the scripted browser was asked to do.
#[derive(Debug, Clone, Default)]
pub struct ScriptLog {
    pub launches: u32,
    pub closes: u32,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub fills: Vec<(String, String)>,
}

#[derive(Default)]
struct ScriptState {
    pages: HashMap<String, Vec<PageOutcome>>,
    visits: HashMap<String, usize>,
    log: ScriptLog,
}

/// Renderer backed by scripted pages.
#[derive(Clone, Default)]
pub struct ScriptedRenderer {
    state: Arc<Mutex<ScriptState>>,
    fail_launch: bool,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer whose sessions never start.
    pub fn failing_launch() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    /// Script the outcomes of successive navigations to `url`.
    pub fn with_page(self, url: &str, outcomes: Vec<PageOutcome>) -> Self {
        self.lock().pages.insert(url.to_string(), outcomes);
        self
    }

    /// Snapshot of the recorded interactions.
    pub fn log(&self) -> ScriptLog {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        // A poisoned lock only means another test thread panicked mid-record.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn launch(&self) -> Result<Box<dyn RenderContext>> {
        if self.fail_launch {
            bail!("scripted browser refused to start");
        }
        self.lock().log.launches += 1;
        Ok(Box::new(ScriptedContext {
            renderer: self.clone(),
            current: None,
        }))
    }
}

/// A session on a [`ScriptedRenderer`].
pub struct ScriptedContext {
    renderer: ScriptedRenderer,
    current: Option<PageSnapshot>,
}

impl ScriptedContext {
    fn element(&self, selector: &str) -> Option<&ScriptedElement> {
        self.current.as_ref().and_then(|page| page.get(selector))
    }
}

#[async_trait]
impl RenderContext for ScriptedContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let outcome = {
            let mut state = self.renderer.lock();
            state.log.navigations.push(url.to_string());
            let visit = {
                let count = state.visits.entry(url.to_string()).or_insert(0);
                *count += 1;
                *count - 1
            };
            state
                .pages
                .get(url)
                .and_then(|outcomes| outcomes.get(visit).or_else(|| outcomes.last()))
                .cloned()
        };

        self.current = None;
        match outcome {
            Some(PageOutcome::Loaded(page)) => {
                self.current = Some(page);
                Ok(NavigationResult {
                    final_url: url.to_string(),
                    load_time_ms: 0,
                })
            }
            Some(PageOutcome::TimedOut) => {
                bail!("navigation timed out after {}ms", timeout.as_millis())
            }
            None => bail!("navigation failed: no scripted page for {url}"),
        }
    }

    async fn wait_for(
        &self,
        selector: &str,
        condition: WaitCondition,
        _timeout: Duration,
    ) -> Result<bool> {
        Ok(match (self.element(selector), condition) {
            (Some(_), WaitCondition::Present) => true,
            (Some(el), WaitCondition::Clickable) => el.clickable,
            (None, _) => false,
        })
    }

    async fn text(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.element(selector).and_then(|el| el.text.clone()))
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .element(selector)
            .and_then(|el| el.attributes.get(name).cloned()))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        match self.element(selector) {
            Some(el) if el.clickable => {
                self.renderer.lock().log.clicks.push(selector.to_string());
                Ok(())
            }
            Some(_) => bail!("element {selector} is not clickable"),
            None => bail!("element {selector} not found"),
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        if self.element(selector).is_none() {
            bail!("input {selector} not found");
        }
        self.renderer
            .lock()
            .log
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.renderer.lock().log.closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    const URL: &str = "https://shop.test/p";
    const WAIT: Duration = Duration::from_millis(10);

    #[test]
    fn test_outcomes_replay_in_order_and_last_repeats() {
        let renderer = ScriptedRenderer::new().with_page(
            URL,
            vec![
                PageOutcome::TimedOut,
                PageOutcome::Loaded(PageSnapshot::new().with_text("#price", "9,99")),
            ],
        );
        let mut ctx = block_on(renderer.launch()).unwrap();

        assert!(block_on(ctx.navigate(URL, WAIT)).is_err());
        block_on(ctx.navigate(URL, WAIT)).unwrap();
        let nav = block_on(ctx.navigate(URL, WAIT)).unwrap();
        assert_eq!(nav.final_url, URL);
        assert_eq!(
            block_on(ctx.text("#price")).unwrap().as_deref(),
            Some("9,99")
        );

        block_on(ctx.close()).unwrap();
        let log = renderer.log();
        assert_eq!(log.navigations.len(), 3);
        assert_eq!((log.launches, log.closes), (1, 1));
    }

    #[test]
    fn test_wait_and_click_respect_clickability() {
        let page = PageSnapshot::new()
            .with_text("#label", "Livraison")
            .with_button("#go");
        let renderer =
            ScriptedRenderer::new().with_page(URL, vec![PageOutcome::Loaded(page)]);
        let mut ctx = block_on(renderer.launch()).unwrap();
        block_on(ctx.navigate(URL, WAIT)).unwrap();

        assert!(block_on(ctx.wait_for("#label", WaitCondition::Present, WAIT)).unwrap());
        assert!(!block_on(ctx.wait_for("#label", WaitCondition::Clickable, WAIT)).unwrap());
        assert!(block_on(ctx.wait_for("#go", WaitCondition::Clickable, WAIT)).unwrap());
        assert!(block_on(ctx.click("#label")).is_err());
        block_on(ctx.click("#go")).unwrap();
        assert_eq!(renderer.log().clicks, vec!["#go".to_string()]);
    }

    #[test]
    fn test_unknown_url_fails_navigation() {
        let renderer = ScriptedRenderer::new();
        let mut ctx = block_on(renderer.launch()).unwrap();
        let err = block_on(ctx.navigate("https://shop.test/unknown", WAIT)).unwrap_err();
        assert!(err.to_string().contains("no scripted page"));
    }

    #[test]
    fn test_failing_launch() {
        assert!(block_on(ScriptedRenderer::failing_launch().launch()).is_err());
    }
}
