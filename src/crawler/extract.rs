//! Document extraction for the three catalog page types
//!
//! - Catalog root: category navigation links
//! - Listing page: book links and the next-page marker
//! - Detail page: a full `BookRecord`, located through the field table in
//!   [`crate::crawler::fields`]
//!
//! Every function here is pure: it takes an already parsed document and the
//! URL it came from.

use crate::crawler::fields::{element_text, evaluate, selector, Field, FieldValues, BOOK_FIELDS};
use crate::model::{parse_availability, parse_price, BookRecord, CategoryRef, Rating};
use crate::url::resolve_link;
use crate::StructureError;
use rust_decimal::Decimal;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

const CATEGORY_BLOCK: &str = "div.side_categories";
const CATEGORY_LINKS: &str = "ul li ul li a";
const BOOK_LINKS: &str = "h3 a";
const NEXT_PAGE: &str = "li.next a";

/// Extracts the categories listed in the catalog's side navigation
///
/// Only the nested entries are returned, so the umbrella "Books" link is not
/// treated as a category. Duplicate URLs are reported once, in page order.
///
/// # Errors
///
/// `StructureError::MissingBlock` if the navigation block is absent.
pub fn extract_category_links(
    document: &Html,
    base_url: &Url,
) -> Result<Vec<CategoryRef>, StructureError> {
    let block = document
        .select(&selector(CATEGORY_BLOCK)?)
        .next()
        .ok_or_else(|| StructureError::MissingBlock {
            url: base_url.to_string(),
            block: "category navigation",
        })?;

    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for anchor in block.select(&selector(CATEGORY_LINKS)?) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, base_url) else {
            tracing::debug!("Skipping unusable category href {:?} on {}", href, base_url);
            continue;
        };
        if seen.insert(url.clone()) {
            categories.push(CategoryRef::new(element_text(anchor), url));
        }
    }

    Ok(categories)
}

/// Extracts the book detail links of a listing page, in listing order
///
/// An empty result is not an error: it is how a walker recognises that a
/// category has no further books.
pub fn extract_book_links(document: &Html, base_url: &Url) -> Result<Vec<Url>, StructureError> {
    let links = document
        .select(&selector(BOOK_LINKS)?)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect();
    Ok(links)
}

/// Returns true if the listing page shows a "next" pagination marker
pub fn has_next_page(document: &Html) -> Result<bool, StructureError> {
    Ok(document.select(&selector(NEXT_PAGE)?).next().is_some())
}

/// Extracts a full book record from a detail page
///
/// Prices have their currency symbol stripped and are parsed as decimals,
/// availability falls back to 0 when no count is shown, and an unknown rating
/// word becomes [`Rating::UNRATED`] with a warning.
///
/// # Errors
///
/// - `StructureError::MissingField` for any required field that is absent
/// - `StructureError::InvalidField` for unparseable prices, an unresolvable
///   image URL, or `price_including_tax < price_excluding_tax`
pub fn extract_book_record(document: &Html, url: &Url) -> Result<BookRecord, StructureError> {
    let values = evaluate(document, BOOK_FIELDS, url)?;

    let price_including_tax = price_field(&values, Field::PriceIncludingTax, url)?;
    let price_excluding_tax = price_field(&values, Field::PriceExcludingTax, url)?;

    let rating_token = values.required(Field::Rating, url)?;
    let rating = Rating::from_token(rating_token);
    if !rating.is_rated() {
        tracing::warn!(
            "Unrecognised rating {:?} on {}; recording as unrated",
            rating_token,
            url
        );
    }

    let image_src = values.required(Field::ImageUrl, url)?;
    let image_url = resolve_link(image_src, url).ok_or_else(|| StructureError::InvalidField {
        url: url.to_string(),
        field: Field::ImageUrl.name(),
        value: image_src.to_string(),
    })?;

    let record = BookRecord {
        product_page_url: url.to_string(),
        upc: values.required(Field::Upc, url)?.to_string(),
        title: values.required(Field::Title, url)?.to_string(),
        price_including_tax,
        price_excluding_tax,
        number_available: values
            .get(Field::Availability)
            .map(parse_availability)
            .unwrap_or(0),
        description: values.get(Field::Description).unwrap_or_default().to_string(),
        category: values.required(Field::Category, url)?.to_string(),
        rating,
        image_url: image_url.to_string(),
    };

    if !record.prices_consistent() {
        return Err(StructureError::InvalidField {
            url: url.to_string(),
            field: Field::PriceIncludingTax.name(),
            value: format!(
                "incl. {} < excl. {}",
                record.price_including_tax, record.price_excluding_tax
            ),
        });
    }

    Ok(record)
}

fn price_field(values: &FieldValues, field: Field, url: &Url) -> Result<Decimal, StructureError> {
    let raw = values.required(field, url)?;
    parse_price(raw).ok_or_else(|| StructureError::InvalidField {
        url: url.to_string(),
        field: field.name(),
        value: raw.to_string(),
    })
}
