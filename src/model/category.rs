use std::collections::VecDeque;
use url::Url;

/// A category discovered in the catalog's navigation block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryRef {
    /// Display name from the navigation link ("Travel")
    pub name: String,
    /// Absolute URL of the first listing page
    pub canonical_url: Url,
}

impl CategoryRef {
    pub fn new(name: impl Into<String>, canonical_url: Url) -> Self {
        Self {
            name: name.into(),
            canonical_url,
        }
    }

    /// Filesystem key for this category ("travel_2")
    ///
    /// Falls back to a sanitized display name when the URL has no usable
    /// directory segment.
    pub fn slug(&self) -> String {
        crate::url::category_slug(&self.canonical_url).unwrap_or_else(|| {
            self.name
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_lowercase()
                    } else {
                        '_'
                    }
                })
                .collect()
        })
    }
}

/// Per-category count and average price
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub category: String,
    pub books_count: u64,
    pub average_price: f64,
}

/// One category's walk over its listing pages
///
/// The job starts with the category's first page pending and is discarded
/// once the category's records have been persisted.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub category: CategoryRef,
    pending_pages: VecDeque<Url>,
    pages_visited: u32,
}

impl CrawlJob {
    pub fn new(category: CategoryRef) -> Self {
        let mut pending_pages = VecDeque::new();
        pending_pages.push_back(category.canonical_url.clone());
        Self {
            category,
            pending_pages,
            pages_visited: 0,
        }
    }

    /// Takes the next listing page to visit
    pub fn next_page(&mut self) -> Option<Url> {
        let page = self.pending_pages.pop_front()?;
        self.pages_visited += 1;
        Some(page)
    }

    /// Queues a listing page after the ones already pending
    pub fn schedule(&mut self, page: Url) {
        self.pending_pages.push_back(page);
    }

    /// Number of listing pages handed out so far
    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }
}
