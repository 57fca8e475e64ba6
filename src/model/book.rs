use crate::model::Rating;
use rust_decimal::Decimal;
use std::str::FromStr;
use url::Url;

/// A link to one book's detail page, found on a category listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookRef {
    pub detail_url: Url,
}

impl BookRef {
    pub fn new(detail_url: Url) -> Self {
        Self { detail_url }
    }
}

/// Fields extracted from one book detail page
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub product_page_url: String,
    pub upc: String,
    pub title: String,
    pub price_including_tax: Decimal,
    pub price_excluding_tax: Decimal,
    pub number_available: u32,
    pub description: String,
    /// Category name as reported by the detail page's breadcrumb
    pub category: String,
    pub rating: Rating,
    pub image_url: String,
}

impl BookRecord {
    /// `price_including_tax >= price_excluding_tax >= 0`
    pub fn prices_consistent(&self) -> bool {
        self.price_excluding_tax >= Decimal::ZERO
            && self.price_including_tax >= self.price_excluding_tax
    }
}

/// Extracts N from an availability string of the form `"... (N available)"`
///
/// Returns 0 when the pattern is absent or N is not a non-negative integer.
///
/// # Example
///
/// ```
/// use bookshelf_crawl::model::parse_availability;
///
/// assert_eq!(parse_availability("In stock (22 available)"), 22);
/// assert_eq!(parse_availability("Out of stock"), 0);
/// ```
pub fn parse_availability(text: &str) -> u32 {
    let Some(start) = text.find('(') else {
        return 0;
    };
    let Some(end) = text[start..].find(" available)") else {
        return 0;
    };
    text[start + 1..start + end].trim().parse().unwrap_or(0)
}

/// Parses a displayed price such as `£51.77`, ignoring any leading currency symbol
pub fn parse_price(text: &str) -> Option<Decimal> {
    let digits = text
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.');
    if digits.is_empty() {
        return None;
    }
    Decimal::from_str(digits).ok()
}
