//! Price extraction with ordered selector fallback.
//!
//! The same price is rendered differently depending on promotion banners,
//! layout experiments and locale. Strategies run from most to least specific;
//! the first one whose text parses wins and the rest are skipped.

use crate::error::AcquireError;
use crate::price::{parse_price, ParseError, Price};
use crate::renderer::{RenderContext, WaitCondition};
use crate::session::PageSession;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One way of locating a price on a product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceStrategy {
    /// A single element holding the full formatted price.
    Text { name: String, selector: String },
    /// Separate whole-number and fraction elements; the fraction is optional.
    WholeFraction {
        name: String,
        whole: String,
        fraction: String,
    },
    /// A price element looked up only inside a page feature area.
    Scoped {
        name: String,
        scope: String,
        selector: String,
    },
    /// A price carried in an element attribute (e.g. a hidden input's value).
    Attribute {
        name: String,
        selector: String,
        attribute: String,
    },
}

impl PriceStrategy {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. }
            | Self::WholeFraction { name, .. }
            | Self::Scoped { name, .. }
            | Self::Attribute { name, .. } => name,
        }
    }

    /// Read raw price text, or `None` if the element did not appear in time.
    async fn read(&self, ctx: &dyn RenderContext, wait: Duration) -> Result<Option<String>> {
        match self {
            Self::Text { selector, .. } => read_text(ctx, selector, wait).await,
            Self::Scoped {
                scope, selector, ..
            } => read_text(ctx, &format!("{scope} {selector}"), wait).await,
            Self::WholeFraction {
                whole, fraction, ..
            } => {
                let Some(whole_text) = read_text(ctx, whole, wait).await? else {
                    return Ok(None);
                };
                // The whole part often carries its own trailing decimal mark ("29,").
                let whole_text = whole_text.trim().trim_end_matches([',', '.']).to_string();
                Ok(Some(match ctx.text(fraction).await? {
                    Some(frac) if !frac.trim().is_empty() => {
                        format!("{whole_text}.{}", frac.trim())
                    }
                    _ => whole_text,
                }))
            }
            Self::Attribute {
                selector,
                attribute,
                ..
            } => {
                if !ctx.wait_for(selector, WaitCondition::Present, wait).await? {
                    return Ok(None);
                }
                ctx.attribute(selector, attribute).await
            }
        }
    }
}

async fn read_text(ctx: &dyn RenderContext, selector: &str, wait: Duration) -> Result<Option<String>> {
    if !ctx.wait_for(selector, WaitCondition::Present, wait).await? {
        return Ok(None);
    }
    ctx.text(selector).await
}

/// Screen-reader copy of the current price. Struck-through list prices carry
/// `data-a-strike` and are excluded.
pub const CURRENT_PRICE: &str = "span.a-price:not([data-a-strike]) span.a-offscreen";
pub const PRICE_WHOLE: &str = PRICE_WHOLE;
pub const PRICE_FRACTION: &str = PRICE_FRACTION;
pub const CORE_PRICE_SCOPE: &str = "#corePrice_feature_div";
/// Visible copy of a price inside a scope. The `span.a-price` container itself
/// holds both copies, so its text reads as two prices run together.
pub const VISIBLE_PRICE: &str = "span.a-price:not([data-a-strike]) span[aria-hidden='true']";
pub const TWISTER_PRICE_DATA: &str = "#twister-plus-price-data-price";

/// Strategies for retail product pages, most reliable first.
pub fn default_strategies() -> Vec<PriceStrategy> {
    vec![
        PriceStrategy::Text {
            name: "aggregate".into(),
            selector: CURRENT_PRICE.into(),
        },
        PriceStrategy::WholeFraction {
            name: "whole-fraction".into(),
            whole: PRICE_WHOLE.into(),
            fraction: PRICE_FRACTION.into(),
        },
        PriceStrategy::Scoped {
            name: "core-price-feature".into(),
            scope: CORE_PRICE_SCOPE.into(),
            selector: VISIBLE_PRICE.into(),
        },
        PriceStrategy::Attribute {
            name: "twister-price-data".into(),
            selector: TWISTER_PRICE_DATA.into(),
            attribute: "value".into(),
        },
    ]
}

/// A successfully extracted price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub price: Price,
    /// Name of the winning strategy.
    pub strategy: String,
    /// Raw text the price was parsed from.
    pub raw: String,
}

/// Runs strategies in order against the current page.
#[derive(Debug, Clone)]
pub struct PriceExtractor {
    strategies: Vec<PriceStrategy>,
    wait: Duration,
}

impl PriceExtractor {
    /// `wait` bounds each strategy's wait for its element.
    pub fn new(strategies: Vec<PriceStrategy>, wait: Duration) -> Self {
        Self { strategies, wait }
    }

    /// Extract the price from the page the session is positioned on.
    ///
    /// Fails with `Parse` when some strategy matched text but none parsed,
    /// and with `NotFound` when no strategy matched at all.
    pub async fn extract(&self, session: &PageSession) -> Result<Extraction, AcquireError> {
        let ctx = session.context();
        let mut parse_failure: Option<ParseError> = None;

        for strategy in &self.strategies {
            match strategy.read(ctx, self.wait).await {
                Ok(Some(raw)) => match parse_price(&raw) {
                    Ok(price) => {
                        debug!(strategy = strategy.name(), %price, "price extracted");
                        return Ok(Extraction {
                            price,
                            strategy: strategy.name().to_string(),
                            raw,
                        });
                    }
                    Err(e) => {
                        debug!(strategy = strategy.name(), error = %e, "unparseable price text");
                        parse_failure = Some(e);
                    }
                },
                Ok(None) => debug!(strategy = strategy.name(), "no price element"),
                Err(e) => debug!(strategy = strategy.name(), error = %e, "strategy failed"),
            }
        }

        Err(match parse_failure {
            Some(e) => AcquireError::Parse(e),
            None => AcquireError::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scripted::{PageOutcome, PageSnapshot, ScriptedRenderer};
    use crate::renderer::Renderer;
    use crate::session::SessionConfig;

    const URL: &str = "https://shop.test/p";

    async fn session_with(page: PageSnapshot) -> PageSession {
        let renderer = ScriptedRenderer::new().with_page(URL, vec![PageOutcome::Loaded(page)]);
        let mut session = PageSession::new(renderer.launch().await.unwrap(), SessionConfig::default());
        session.open(URL).await.unwrap();
        session
    }

    fn extractor() -> PriceExtractor {
        PriceExtractor::new(default_strategies(), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_first_strategy_wins() {
        let session = session_with(
            PageSnapshot::new()
                .with_text(CURRENT_PRICE, "29,99 €")
                .with_text(PRICE_WHOLE, "31,")
                .with_text(PRICE_FRACTION, "00"),
        )
        .await;
        let got = extractor().extract(&session).await.unwrap();
        assert_eq!(got.price, Price::from_cents(2_999));
        assert_eq!(got.strategy, "aggregate");
    }

    #[tokio::test]
    async fn test_whole_fraction_fallback() {
        let session = session_with(
            PageSnapshot::new()
                .with_text(PRICE_WHOLE, "1\u{a0}234,")
                .with_text(PRICE_FRACTION, "56"),
        )
        .await;
        let got = extractor().extract(&session).await.unwrap();
        assert_eq!(got.price, Price::from_cents(123_456));
        assert_eq!(got.strategy, "whole-fraction");
    }

    #[tokio::test]
    async fn test_whole_without_fraction() {
        let session = session_with(PageSnapshot::new().with_text(PRICE_WHOLE, "49,")).await;
        let got = extractor().extract(&session).await.unwrap();
        assert_eq!(got.price, Price::from_cents(4_900));
    }

    #[tokio::test]
    async fn test_scoped_and_attribute_strategies() {
        let session = session_with(
            PageSnapshot::new()
                .with_text("#corePrice_feature_div span.a-price", "29,99 €29,99€")
                .with_text(&format!("{CORE_PRICE_SCOPE} {VISIBLE_PRICE}"), "29,99€"),
        )
        .await;
        let got = extractor().extract(&session).await.unwrap();
        assert_eq!(got.strategy, "core-price-feature");
        assert_eq!(got.price, Price::from_cents(2_999));

        let session = session_with(PageSnapshot::new().with_attribute(
            "#twister-plus-price-data-price",
            "value",
            "17.5",
        ))
        .await;
        let got = extractor().extract(&session).await.unwrap();
        assert_eq!(got.price, Price::from_cents(1_750));
        assert_eq!(got.strategy, "twister-price-data");
    }

    #[tokio::test]
    async fn test_unparseable_text_falls_through_to_next_strategy() {
        let session = session_with(
            PageSnapshot::new()
                .with_text(CURRENT_PRICE, "Voir les options")
                .with_text(PRICE_WHOLE, "8,")
                .with_text(PRICE_FRACTION, "49"),
        )
        .await;
        let got = extractor().extract(&session).await.unwrap();
        assert_eq!(got.price, Price::from_cents(849));
    }

    #[tokio::test]
    async fn test_not_found_vs_parse_error() {
        let session = session_with(PageSnapshot::new().with_text("#title", "Manette")).await;
        assert!(matches!(
            extractor().extract(&session).await,
            Err(AcquireError::NotFound)
        ));

        let session =
            session_with(PageSnapshot::new().with_text(CURRENT_PRICE, "€0")).await;
        assert!(matches!(
            extractor().extract(&session).await,
            Err(AcquireError::Parse(ParseError::NonPositive(_)))
        ));
    }

    #[tokio::test]
    async fn test_struck_list_price_is_not_current() {
        let session = session_with(
            PageSnapshot::new()
                .with_text("span.a-price[data-a-strike] span.a-offscreen", "49,99 €")
                .with_text(PRICE_WHOLE, "29,")
                .with_text(PRICE_FRACTION, "99"),
        )
        .await;
        let got = extractor().extract(&session).await.unwrap();
        assert_eq!(got.price, Price::from_cents(2_999));
        assert_eq!(got.strategy, "whole-fraction");
    }

    #[test]
    fn test_text_selectors_skip_struck_prices() {
        for strategy in default_strategies() {
            if let PriceStrategy::Text { selector, .. } | PriceStrategy::Scoped { selector, .. } =
                &strategy
            {
                assert!(selector.contains(":not([data-a-strike])"), "{}", strategy.name());
            }
        }
    }

    #[test]
    fn test_strategies_deserialize_from_json() {
        let strategies: Vec<PriceStrategy> = serde_json::from_str(
            r#"[{"kind": "text", "name": "offer", "selector": ".offer-price"}]"#,
        )
        .unwrap();
        assert_eq!(strategies[0].name(), "offer");
    }
}
