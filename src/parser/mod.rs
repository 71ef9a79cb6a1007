pub mod content;
pub mod fields;
pub mod price;

use scraper::Html;
use serde::Serialize;

use content::PriceQuote;
use fields::ProductFields;

/// Everything pulled out of one listing page.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub description: String,
    pub fields: ProductFields,
    pub prices: PriceQuote,
}

/// markup → description + prices → fields. `None` when the page has no
/// description block; prices are optional and never cause a miss.
pub fn process_page(html: &str) -> Option<Listing> {
    let doc = Html::parse_document(html);
    let description = content::extract_description(&doc)?;
    let fields = fields::parse_fields(&description);
    let prices = content::extract_prices(&doc);

    Some(Listing {
        description,
        fields,
        prices,
    })
}

// ── Tests ──
