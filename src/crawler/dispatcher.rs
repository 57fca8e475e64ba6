//! Bounded-concurrency detail dispatcher
//!
//! Fetches and extracts the detail pages of one category with at most K
//! operations in flight. Results come back in input order regardless of
//! completion order, so CSV output is deterministic.
//!
//! The permit pool is owned by the dispatcher, not by a single `dispatch`
//! call: when several categories are processed at once they share it, and K
//! stays the ceiling for the whole run.

use crate::crawler::extract::extract_book_record;
use crate::crawler::fetcher::Fetcher;
use crate::model::{BookRecord, BookRef};
use crate::output::images::{save_image, ImageTarget};
use crate::output::stats::{Failure, Stage};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of one cover image download
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Saved(PathBuf),
    Failed(Failure),
}

/// Result of one detail page, at the position of its `BookRef`
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Extracted {
        record: BookRecord,
        image: Option<ImageOutcome>,
    },
    Failed(Failure),
    Cancelled {
        url: Url,
    },
}

/// Runs detail fetch + extraction with a shared concurrency ceiling
pub struct Dispatcher {
    fetcher: Arc<dyn Fetcher>,
    permits: Arc<Semaphore>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Creates a dispatcher allowing `concurrency` operations in flight
    ///
    /// A concurrency of 1 processes detail pages strictly one after another.
    pub fn new(fetcher: Arc<dyn Fetcher>, concurrency: usize, cancel: CancellationToken) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            fetcher,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            cancel,
        }
    }

    /// Processes `books`, returning one outcome per input in input order
    ///
    /// A failing page becomes a `DetailOutcome::Failed` at its position and
    /// does not affect the others. When `images` is set, each extracted record
    /// also has its cover image downloaded into that target.
    pub async fn dispatch(
        &self,
        books: &[BookRef],
        images: Option<&ImageTarget>,
    ) -> Vec<DetailOutcome> {
        let mut slots: Vec<Option<DetailOutcome>> = books.iter().map(|_| None).collect();

        let mut results = stream::iter(books.iter().enumerate())
            .map(|(index, book)| async move { (index, self.process(book, images).await) })
            .buffer_unordered(self.concurrency);

        while let Some((index, outcome)) = results.next().await {
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .zip(books)
            .map(|(slot, book)| {
                slot.unwrap_or_else(|| DetailOutcome::Cancelled {
                    url: book.detail_url.clone(),
                })
            })
            .collect()
    }

    async fn process(&self, book: &BookRef, images: Option<&ImageTarget>) -> DetailOutcome {
        let cancelled = || DetailOutcome::Cancelled {
            url: book.detail_url.clone(),
        };

        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return cancelled(),
            permit = self.permits.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return cancelled(),
            },
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => cancelled(),
            outcome = self.fetch_and_extract(book, images) => outcome,
        }
    }

    async fn fetch_and_extract(
        &self,
        book: &BookRef,
        images: Option<&ImageTarget>,
    ) -> DetailOutcome {
        let url = &book.detail_url;

        let page = match self.fetcher.fetch_page(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("[detail] Skipping {}: {}", url, e.cause);
                return DetailOutcome::Failed(Failure::new(Stage::Detail, url.as_str(), e.cause));
            }
        };

        let extracted = {
            let document = page.document();
            extract_book_record(&document, &page.url)
        };
        let record = match extracted {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("[detail] Skipping {}: {}", url, e);
                return DetailOutcome::Failed(Failure::structural(Stage::Detail, url.as_str(), e));
            }
        };

        let image = match images {
            Some(target) => Some(self.download_image(&record, target).await),
            None => None,
        };

        DetailOutcome::Extracted { record, image }
    }

    async fn download_image(&self, record: &BookRecord, target: &ImageTarget) -> ImageOutcome {
        let url = match Url::parse(&record.image_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("[image] Bad image URL {:?}: {}", record.image_url, e);
                return ImageOutcome::Failed(Failure::new(Stage::Image, &record.image_url, e));
            }
        };

        match save_image(self.fetcher.as_ref(), &url, target).await {
            Ok(path) => ImageOutcome::Saved(path),
            Err(e) => {
                tracing::warn!("[image] Failed to save {}: {}", url, e);
                ImageOutcome::Failed(Failure::new(Stage::Image, url.as_str(), e))
            }
        }
    }
}
