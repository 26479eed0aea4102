//! Browsing capability used by the acquisition pipeline.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (Chromium via chromiumoxide in production, a scripted
//! in-memory page set in tests).

pub mod chromium;
pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// What an element must satisfy before a wait returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// Attached to the document.
    Present,
    /// Present, laid out, and not disabled.
    Clickable,
}

/// A browser engine that can start a session.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Start one browsing session (browser process and a single tab).
    async fn launch(&self) -> Result<Box<dyn RenderContext>>;
}

/// One live browsing session.
///
/// Selectors are CSS selectors; the first matching element is used.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL, failing if the page is not ready within `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Wait until an element satisfies `condition`. Returns `false` on timeout.
    async fn wait_for(
        &self,
        selector: &str,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<bool>;
    /// Text content of the first matching element.
    async fn text(&self, selector: &str) -> Result<Option<String>>;
    /// Attribute value of the first matching element.
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;
    /// Click the first matching element.
    async fn click(&self, selector: &str) -> Result<()>;
    /// Clear an input and type `value` into it.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;
    /// Close the session and release the browser.
    async fn close(self: Box<Self>) -> Result<()>;
}
