//! Pagination walker for category listings
//!
//! Walks `index.html`, `page-2.html`, `page-3.html`, ... of one category and
//! collects the book links in listing order. The walk stops at the first page
//! that yields no book links or shows no "next" marker, whichever comes first;
//! an empty page ends the walk even if it still advertises a next page.

use crate::crawler::extract::{extract_book_links, has_next_page};
use crate::crawler::fetcher::Fetcher;
use crate::model::{BookRef, CategoryRef, CrawlJob};
use crate::url::next_listing_url;
use crate::CrawlError;
use tokio_util::sync::CancellationToken;

/// How far a walk may go
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Visit pages after the first one
    pub follow_pagination: bool,
    /// Hard cap on pages visited for one category
    pub max_pages: u32,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_pagination: true,
            max_pages: 500,
        }
    }
}

/// Result of walking one category's listing pages
#[derive(Debug, Clone)]
pub struct ListingWalk {
    pub books: Vec<BookRef>,
    pub pages_visited: u32,
}

/// Walks the listing pages of `category`
///
/// # Errors
///
/// - `CrawlError::Fetch` if a listing page cannot be fetched
/// - `CrawlError::Structure` if a listing page cannot be queried
/// - `CrawlError::Cancelled` if `cancel` fires between pages
pub async fn walk_category(
    fetcher: &dyn Fetcher,
    category: &CategoryRef,
    options: WalkOptions,
    cancel: &CancellationToken,
) -> Result<ListingWalk, CrawlError> {
    let mut job = CrawlJob::new(category.clone());
    let mut books = Vec::new();

    while let Some(page_url) = job.next_page() {
        if cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }

        let page = fetcher.fetch_page(&page_url).await?;
        let (links, has_next) = {
            let document = page.document();
            (
                extract_book_links(&document, &page.url)?,
                has_next_page(&document)?,
            )
        };

        tracing::debug!(
            "Listing page {} of '{}' has {} books (next: {})",
            job.pages_visited(),
            category.name,
            links.len(),
            has_next
        );

        if links.is_empty() {
            break;
        }
        books.extend(links.into_iter().map(BookRef::new));

        if !options.follow_pagination || !has_next {
            break;
        }

        if job.pages_visited() >= options.max_pages {
            tracing::warn!(
                "Stopping '{}' after {} listing pages (max_pages_per_category)",
                category.name,
                options.max_pages
            );
            break;
        }

        job.schedule(next_listing_url(&page_url)?);
    }

    Ok(ListingWalk {
        books,
        pages_visited: job.pages_visited(),
    })
}
