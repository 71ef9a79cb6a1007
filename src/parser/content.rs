use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use super::price::normalize_price;

static DESCRIPTION_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-qa-id="adview_description_container"]"#).unwrap());
static README_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p#readme-content").unwrap());
static NESTED_DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static PRICE_HEADLINE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[data-qa-id="adview_price"] p.text-headline-1"#).unwrap()
});
static DELETION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"p[role="deletion"]"#).unwrap());

/// Current and struck-through prices, already normalized. Empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub promo: String,
    pub regular: String,
}

/// Text nodes of `el`, trimmed, empties dropped, joined with `sep`.
fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn class_contains(el: &ElementRef<'_>, fragments: &[&str]) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| fragments.iter().all(|f| class.contains(f)))
}

/// Description block text, one display line per `\n`.
pub fn extract_description(doc: &Html) -> Option<String> {
    let container = doc.select(&DESCRIPTION_CONTAINER).next()?;
    let content = container
        .select(&README_CONTENT)
        .next()
        .or_else(|| container.select(&NESTED_DIV).next())?;

    let text = joined_text(content, "\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn extract_prices(doc: &Html) -> PriceQuote {
    let mut promo = doc
        .select(&PRICE_HEADLINE)
        .next()
        .map(|el| normalize_price(&joined_text(el, "")))
        .unwrap_or_default();

    // Compact layout: "199 € · Livraison possible"
    if promo.is_empty() {
        promo = doc
            .select(&NESTED_DIV)
            .find(|el| class_contains(el, &["text-body-2", "font-bold"]))
            .map(|el| {
                let text = joined_text(el, "");
                let head = text.split('·').next().unwrap_or_default();
                normalize_price(head.trim())
            })
            .unwrap_or_default();
    }

    let regular = doc
        .select(&DELETION)
        .find(|el| class_contains(el, &["line-through"]))
        .map(|el| normalize_price(&joined_text(el, "")))
        .unwrap_or_default();

    PriceQuote { promo, regular }
}
