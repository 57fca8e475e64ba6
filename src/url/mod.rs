//! URL handling module for Bookshelf-Crawl
//!
//! This module provides relative link resolution, category slugs, and the
//! `page-N.html` arithmetic used to walk paginated listings.

use url::Url;

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only or empty hrefs
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}

/// Directory-style key of a category listing URL
///
/// This is the path segment holding the listing's file, e.g. `travel_2` for
/// `.../category/books/travel_2/index.html`.
pub fn category_slug(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    if segments.len() < 2 {
        return None;
    }
    let slug = segments[segments.len() - 2];
    (!slug.is_empty()).then(|| slug.to_string())
}

/// Page number of a listing URL; `index.html` and bare directories count as page 1
pub fn listing_page_number(url: &Url) -> u32 {
    let file = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    file.strip_prefix("page-")
        .and_then(|rest| rest.strip_suffix(".html"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

/// URL of the listing page after `current`, built by incrementing its page number
///
/// # Example
///
/// ```
/// use bookshelf_crawl::url::next_listing_url;
/// use url::Url;
///
/// let first = Url::parse("http://books.toscrape.com/catalogue/category/books/travel_2/index.html").unwrap();
/// let second = next_listing_url(&first).unwrap();
/// assert_eq!(second.as_str(), "http://books.toscrape.com/catalogue/category/books/travel_2/page-2.html");
/// ```
pub fn next_listing_url(current: &Url) -> Result<Url, url::ParseError> {
    let next = listing_page_number(current) + 1;
    current.join(&format!("page-{}.html", next))
}
