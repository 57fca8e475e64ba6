//! Declarative field table for book detail pages
//!
//! Each field of a book record is described by a locator rule. Rules are
//! evaluated uniformly against a parsed document, so adding or removing a
//! field only touches [`BOOK_FIELDS`].

use crate::StructureError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// A named field of a book detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Upc,
    PriceIncludingTax,
    PriceExcludingTax,
    Availability,
    Description,
    Category,
    Rating,
    ImageUrl,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Upc => "upc",
            Self::PriceIncludingTax => "price_including_tax",
            Self::PriceExcludingTax => "price_excluding_tax",
            Self::Availability => "number_available",
            Self::Description => "product_description",
            Self::Category => "category",
            Self::Rating => "review_rating",
            Self::ImageUrl => "image_url",
        }
    }
}

/// Where a field's raw value lives in the document
#[derive(Debug, Clone, Copy)]
pub enum Locator {
    /// Text of the first element matching `css`
    Text { css: &'static str },
    /// Text of the `<td>` whose sibling `<th>` reads `label` in the product information table
    InfoRow { label: &'static str },
    /// Attribute of the first element matching `css`
    Attr {
        css: &'static str,
        attr: &'static str,
    },
    /// Text of the `index`-th element matching `css`
    NthText { css: &'static str, index: usize },
    /// The `index`-th class name of the first element matching `css`
    ClassToken { css: &'static str, index: usize },
}

/// Locator rule for one field
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: Field,
    pub locator: Locator,
    pub required: bool,
}

const fn rule(field: Field, locator: Locator, required: bool) -> FieldRule {
    FieldRule {
        field,
        locator,
        required,
    }
}

/// Field table for a catalog book detail page
pub const BOOK_FIELDS: &[FieldRule] = &[
    rule(Field::Title, Locator::Text { css: "h1" }, true),
    rule(Field::Upc, Locator::InfoRow { label: "UPC" }, true),
    rule(
        Field::PriceIncludingTax,
        Locator::InfoRow {
            label: "Price (incl. tax)",
        },
        true,
    ),
    rule(
        Field::PriceExcludingTax,
        Locator::InfoRow {
            label: "Price (excl. tax)",
        },
        true,
    ),
    rule(
        Field::Availability,
        Locator::InfoRow {
            label: "Availability",
        },
        false,
    ),
    rule(
        Field::Description,
        Locator::Attr {
            css: "meta[name=\"description\"]",
            attr: "content",
        },
        false,
    ),
    rule(
        Field::Category,
        Locator::NthText {
            css: "ul.breadcrumb li a",
            index: 2,
        },
        true,
    ),
    rule(
        Field::Rating,
        Locator::ClassToken {
            css: "p.star-rating",
            index: 1,
        },
        true,
    ),
    rule(
        Field::ImageUrl,
        Locator::Attr {
            css: "img",
            attr: "src",
        },
        true,
    ),
];

/// Raw string values located by a field table
#[derive(Debug, Default)]
pub struct FieldValues {
    values: HashMap<Field, String>,
}

impl FieldValues {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Value of a field the table marks as required
    pub fn required(&self, field: Field, url: &Url) -> Result<&str, StructureError> {
        self.get(field).ok_or_else(|| StructureError::MissingField {
            url: url.to_string(),
            field: field.name(),
        })
    }
}

/// Parses a static CSS selector
pub(crate) fn selector(css: &str) -> Result<Selector, StructureError> {
    Selector::parse(css).map_err(|e| StructureError::Selector(format!("{}: {:?}", css, e)))
}

/// Collapses an element's text into single-spaced, trimmed form
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Evaluates every rule of `rules` against `document`
///
/// Missing optional fields are left out of the result; a missing required
/// field is a `StructureError::MissingField` naming it.
pub fn evaluate(
    document: &Html,
    rules: &[FieldRule],
    url: &Url,
) -> Result<FieldValues, StructureError> {
    let info_table = product_information(document)?;
    let mut values = FieldValues::default();

    for rule in rules {
        let value = locate(document, &info_table, rule.locator)?;
        match value {
            Some(value) if !value.is_empty() => {
                values.values.insert(rule.field, value);
            }
            _ if rule.required => {
                return Err(StructureError::MissingField {
                    url: url.to_string(),
                    field: rule.field.name(),
                });
            }
            _ => tracing::debug!("Optional field '{}' absent on {}", rule.field.name(), url),
        }
    }

    Ok(values)
}

fn locate(
    document: &Html,
    info_table: &HashMap<String, String>,
    locator: Locator,
) -> Result<Option<String>, StructureError> {
    let value = match locator {
        Locator::Text { css } => document.select(&selector(css)?).next().map(element_text),
        Locator::InfoRow { label } => info_table.get(label).cloned(),
        Locator::Attr { css, attr } => document
            .select(&selector(css)?)
            .next()
            .and_then(|element| element.value().attr(attr))
            .map(|value| value.trim().to_string()),
        Locator::NthText { css, index } => {
            document.select(&selector(css)?).nth(index).map(element_text)
        }
        Locator::ClassToken { css, index } => document
            .select(&selector(css)?)
            .next()
            .and_then(|element| element.value().attr("class"))
            .and_then(|classes| classes.split_whitespace().nth(index))
            .map(str::to_string),
    };
    Ok(value)
}

/// Label -> value map of the product information table
fn product_information(document: &Html) -> Result<HashMap<String, String>, StructureError> {
    let row_selector = selector("table tr")?;
    let th_selector = selector("th")?;
    let td_selector = selector("td")?;

    let mut rows = HashMap::new();
    for row in document.select(&row_selector) {
        let label = row.select(&th_selector).next().map(element_text);
        let value = row.select(&td_selector).next().map(element_text);
        if let (Some(label), Some(value)) = (label, value) {
            rows.entry(label).or_insert(value);
        }
    }
    Ok(rows)
}
