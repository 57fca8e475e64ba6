//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a whole run:
//! - Fetching the catalog root and discovering categories
//! - Walking each category's listing pages
//! - Dispatching detail pages to the bounded worker pool
//! - Writing per-category CSVs, the aggregate, and the charts
//! - Observing cancellation between and inside every stage

use crate::config::{Config, OutputConfig};
use crate::crawler::dispatcher::{DetailOutcome, Dispatcher, ImageOutcome};
use crate::crawler::extract::extract_category_links;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::pagination::{walk_category, WalkOptions};
use crate::model::{BookRecord, CategoryRef};
use crate::output::aggregate::{aggregate, write_aggregate, Aggregate};
use crate::output::charts::{render_charts, SvgChartRenderer};
use crate::output::csv_output::write_category_records;
use crate::output::images::ImageTarget;
use crate::output::stats::{CategoryOutcome, CategoryStatus, CrawlReport, Failure, Stage};
use crate::{CrawlError, PersistenceError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator with an HTTP fetcher built from `config`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `cancel` - Token that stops the run when cancelled
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - The HTTP client could not be built
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::from_config(&config.user_agent, &config.crawler)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), cancel))
    }

    /// Creates a coordinator on top of an existing fetcher
    pub fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        cancel: CancellationToken,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            fetcher.clone(),
            config.crawler.max_concurrent_fetches as usize,
            cancel.clone(),
        );
        Self {
            config: Arc::new(config),
            fetcher,
            dispatcher,
            cancel,
        }
    }

    /// Runs the whole crawl
    ///
    /// Per-category and per-book failures are recorded in the returned report
    /// and never abort the run. Only an unusable catalog root does.
    ///
    /// # Errors
    ///
    /// - `CrawlError::Fetch` if the catalog root cannot be fetched
    /// - `CrawlError::Structure` if the root has no category navigation
    /// - `CrawlError::Cancelled` if cancelled before categories were known
    pub async fn run(&self) -> Result<CrawlReport, CrawlError> {
        let mut report = CrawlReport::new(Utc::now());
        let root = Url::parse(&self.config.crawler.root_url)?;

        tracing::info!("Starting crawl at {}", root);
        let categories = self.discover_categories(&root).await?;
        report.categories_found = categories.len() as u64;
        tracing::info!("Found {} categories", categories.len());

        let concurrent_categories = self.config.crawler.concurrent_categories.max(1) as usize;
        let outcomes: Vec<CategoryOutcome> = stream::iter(categories.iter())
            .map(|category| self.crawl_category(category))
            .buffered(concurrent_categories)
            .collect()
            .await;

        let mut records: Vec<BookRecord> = Vec::new();
        for outcome in &outcomes {
            report.absorb(outcome);
            if matches!(outcome.status, CategoryStatus::Written(_)) {
                records.extend(outcome.records.iter().cloned());
            }
        }

        if self.cancel.is_cancelled() {
            report.cancelled = true;
            tracing::warn!("Crawl cancelled; aggregate and charts were not updated");
        } else if let Err(e) = publish_aggregate(&self.config.output, &records) {
            tracing::warn!("[persist] {}", e);
            report.record_failure(Failure::new(
                Stage::Persist,
                self.config.output.aggregate_path.display().to_string(),
                e,
            ));
        }

        report.finish(Utc::now());
        tracing::info!(
            "Crawl finished: {} books in {} categories, {} skipped",
            report.books_written,
            report.categories_written,
            report.books_skipped
        );

        Ok(report)
    }

    /// Fetches the catalog root and lists its categories
    pub async fn discover_categories(&self, root: &Url) -> Result<Vec<CategoryRef>, CrawlError> {
        let page = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(CrawlError::Cancelled),
            page = self.fetcher.fetch_page(root) => page?,
        };

        let document = page.document();
        Ok(extract_category_links(&document, &page.url)?)
    }

    /// Crawls one category end to end and writes its CSV
    ///
    /// Never fails: every problem is folded into the returned outcome.
    async fn crawl_category(&self, category: &CategoryRef) -> CategoryOutcome {
        if self.cancel.is_cancelled() {
            return CategoryOutcome::cancelled(&category.name);
        }

        let slug = category.slug();
        let mut outcome = CategoryOutcome::new(&category.name);
        tracing::info!("Crawling category '{}' ({})", category.name, category.canonical_url);

        let options = WalkOptions {
            follow_pagination: self.config.crawler.follow_pagination,
            max_pages: self.config.crawler.max_pages_per_category,
        };
        let walk = match walk_category(self.fetcher.as_ref(), category, options, &self.cancel).await
        {
            Ok(walk) => walk,
            Err(CrawlError::Cancelled) => return CategoryOutcome::cancelled(&category.name),
            Err(e) => {
                tracing::warn!("[listing] Abandoning category '{}': {}", category.name, e);
                let target = match &e {
                    CrawlError::Fetch(fetch) => fetch.url.clone(),
                    _ => category.canonical_url.to_string(),
                };
                outcome.failures.push(if e.is_structural() {
                    Failure::structural(Stage::Listing, target, e)
                } else {
                    Failure::new(Stage::Listing, target, e)
                });
                return outcome;
            }
        };
        outcome.pages_visited = walk.pages_visited;

        let images = self
            .config
            .crawler
            .download_images
            .then(|| ImageTarget::for_category(&self.config.output.data_dir, &slug));

        let mut cancelled = false;
        for result in self.dispatcher.dispatch(&walk.books, images.as_ref()).await {
            match result {
                DetailOutcome::Extracted { record, image } => {
                    match image {
                        Some(ImageOutcome::Saved(_)) => outcome.images_saved += 1,
                        Some(ImageOutcome::Failed(failure)) => {
                            outcome.images_failed += 1;
                            outcome.failures.push(failure);
                        }
                        None => {}
                    }
                    outcome.records.push(record);
                }
                DetailOutcome::Failed(failure) => {
                    outcome.books_skipped += 1;
                    outcome.failures.push(failure);
                }
                DetailOutcome::Cancelled { .. } => cancelled = true,
            }
        }

        // A partial category never replaces a previous complete CSV
        if cancelled {
            tracing::warn!("Category '{}' cancelled before completion", category.name);
            outcome.status = CategoryStatus::Cancelled;
            return outcome;
        }

        match write_category_records(&self.config.output.data_dir, &slug, &outcome.records) {
            Ok(path) => {
                tracing::info!(
                    "Category '{}': {} books over {} pages written to {}",
                    category.name,
                    outcome.records.len(),
                    outcome.pages_visited,
                    path.display()
                );
                outcome.status = CategoryStatus::Written(path);
            }
            Err(e) => {
                tracing::warn!("[persist] Category '{}': {}", category.name, e);
                let target = persistence_target(&e);
                outcome.failures.push(Failure::new(Stage::Persist, target, e));
            }
        }

        outcome
    }
}

/// Aggregates `records`, writes the aggregate CSV, and renders the charts
///
/// Charts are skipped when `output.render_charts` is off.
pub fn publish_aggregate(
    output: &OutputConfig,
    records: &[BookRecord],
) -> Result<Aggregate, PersistenceError> {
    let stats = aggregate(records);
    write_aggregate(&output.aggregate_path, &stats)?;

    if output.render_charts {
        render_charts(&SvgChartRenderer::new(&output.charts_dir), &stats)?;
    }

    Ok(stats)
}

fn persistence_target(error: &PersistenceError) -> String {
    match error {
        PersistenceError::Io { path, .. }
        | PersistenceError::Csv { path, .. }
        | PersistenceError::Malformed { path, .. } => path.display().to_string(),
    }
}
