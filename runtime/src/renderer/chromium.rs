//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, Renderer, WaitCondition};
use crate::config::Settings;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Interval between element polls while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. PRICEWATCH_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("PRICEWATCH_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.pricewatch/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".pricewatch/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pricewatch/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pricewatch/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".pricewatch/chromium/chrome-linux64/chrome"),
                home.join(".pricewatch/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch options for [`ChromiumRenderer`].
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
}

impl ChromiumOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            executable: settings.chromium_path.clone(),
            headless: settings.headless,
            user_agent: settings.user_agent.clone(),
        }
    }
}

/// Chromium-based renderer. Each `launch` starts a fresh browser process.
pub struct ChromiumRenderer {
    options: ChromiumOptions,
}

impl ChromiumRenderer {
    pub fn new(options: ChromiumOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let chrome_path = match &self.options.executable {
            Some(path) => path.clone(),
            None => find_chromium()
                .context("Chromium not found. Set PRICEWATCH_CHROMIUM_PATH.")?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--window-size=1920,1080")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", self.options.user_agent));

        builder = if self.options.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn launch(&self) -> Result<Box<dyn RenderContext>> {
        let config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // The handler drives the CDP connection and must be polled for the
        // browser's whole lifetime.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                bail!("failed to create new page: {e}");
            }
        };

        Ok(Box::new(ChromiumContext {
            browser,
            page,
            handler_task,
        }))
    }
}

/// A Chromium browser with its single tab.
pub struct ChromiumContext {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumContext {
    async fn eval<T: serde::de::DeserializeOwned + Send>(&self, script: String) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    /// Evaluate a script yielding a string or `null`.
    ///
    /// CDP reports `null` as an absent value, which `into_value` rejects, so the
    /// raw value is inspected instead.
    async fn eval_optional_string(&self, script: String) -> Result<Option<String>> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;
        Ok(optional_string(result.value()))
    }
}

/// `None` for a missing or `null` JS value; strings as-is, anything else as JSON text.
fn optional_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Quote a string as a JavaScript literal.
fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn probe_script(selector: &str, condition: WaitCondition) -> String {
    let sel = js_str(selector);
    match condition {
        WaitCondition::Present => format!("document.querySelector({sel}) !== null"),
        WaitCondition::Clickable => format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return false; \
             const r = el.getBoundingClientRect(); \
             return !el.disabled && r.width > 0 && r.height > 0; }})()"
        ),
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }
    }

    async fn wait_for(
        &self,
        selector: &str,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<bool> {
        let script = probe_script(selector, condition);
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(script.clone()).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn text(&self, selector: &str) -> Result<Option<String>> {
        // textContent also covers visually hidden screen-reader price spans.
        self.eval_optional_string(format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent : null; }})()",
            js_str(selector)
        ))
        .await
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        self.eval_optional_string(format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.getAttribute({}) : null; }})()",
            js_str(selector),
            js_str(name)
        ))
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("element {selector} not found"))?;
        element
            .click()
            .await
            .with_context(|| format!("failed to click {selector}"))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let cleared: bool = self
            .eval(format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.value = ''; return true; }})()",
                js_str(selector)
            ))
            .await?;
        if !cleared {
            bail!("input {selector} not found");
        }

        let element = self.page.find_element(selector).await?;
        element.click().await?;
        element
            .type_str(value)
            .await
            .with_context(|| format!("failed to type into {selector}"))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumContext {
            mut browser,
            page,
            handler_task,
        } = *self;

        let _ = page.close().await;
        let closed = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();

        closed.context("failed to close Chromium")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str(r#"a[href="x"]"#), r#""a[href=\"x\"]""#);
    }

    #[test]
    fn test_null_js_value_is_none() {
        use serde_json::json;

        assert_eq!(optional_string(None), None);
        assert_eq!(optional_string(Some(&json!(null))), None);
        assert_eq!(
            optional_string(Some(&json!("29,99 €"))).as_deref(),
            Some("29,99 €")
        );
        assert_eq!(optional_string(Some(&json!(17.5))).as_deref(), Some("17.5"));
    }

    #[test]
    fn test_probe_script_embeds_selector() {
        let script = probe_script("#sp-cc-accept", WaitCondition::Present);
        assert_eq!(script, r##"document.querySelector("#sp-cc-accept") !== null"##);
        let script = probe_script("#GLUXZipUpdate", WaitCondition::Clickable);
        assert!(script.contains("getBoundingClientRect"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_read() {
        let renderer = ChromiumRenderer::new(ChromiumOptions {
            executable: None,
            headless: true,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        });
        let mut ctx = renderer.launch().await.expect("failed to launch");

        let html = "data:text/html,\
            <span class='a-price' data-a-strike='true'><span class='a-offscreen'>49,99 €</span></span>\
            <span class='a-price'><span class='a-offscreen'>29,99 €</span></span>\
            <span class='a-price-whole'>29,</span>";
        ctx.navigate(html, Duration::from_secs(10))
            .await
            .expect("navigation failed");

        let current = crate::extract::CURRENT_PRICE;
        assert!(ctx
            .wait_for(current, WaitCondition::Present, Duration::from_secs(2))
            .await
            .unwrap());
        assert_eq!(ctx.text(current).await.unwrap().as_deref(), Some("29,99 €"));

        // Missing elements and attributes read as None, not as errors.
        assert_eq!(ctx.text("span.a-price-fraction").await.unwrap(), None);
        assert_eq!(ctx.attribute("span.a-price-whole", "value").await.unwrap(), None);
        assert!(!ctx
            .wait_for("#missing", WaitCondition::Present, Duration::from_millis(300))
            .await
            .unwrap());

        ctx.close().await.expect("close failed");
    }
}
