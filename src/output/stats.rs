//! Run statistics and failure accounting
//!
//! Every failure is attributed to a pipeline stage and a URL (or path), so a
//! run summary can say exactly what was skipped and why.

use crate::model::BookRecord;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Pipeline stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Category listing walk
    Listing,
    /// Book detail fetch or extraction
    Detail,
    /// Cover image fetch or write
    Image,
    /// CSV or chart output
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Listing => "listing",
            Self::Detail => "detail",
            Self::Image => "image",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// One isolated failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    /// URL or output path the failure is attributed to
    pub target: String,
    pub message: String,
    /// The document did not match the extractor's expectations
    pub structural: bool,
}

impl Failure {
    pub fn new(stage: Stage, target: impl Into<String>, message: impl ToString) -> Self {
        Self {
            stage,
            target: target.into(),
            message: message.to_string(),
            structural: false,
        }
    }

    pub fn structural(stage: Stage, target: impl Into<String>, message: impl ToString) -> Self {
        Self {
            structural: true,
            ..Self::new(stage, target, message)
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.target, self.message)
    }
}

/// How one category's crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    /// Records were written to this CSV
    Written(PathBuf),
    /// The listing walk or the CSV write failed
    Failed,
    /// The run was cancelled before the category finished
    Cancelled,
}

/// Everything one category's crawl produced
#[derive(Debug, Clone)]
pub struct CategoryOutcome {
    pub name: String,
    pub status: CategoryStatus,
    pub records: Vec<BookRecord>,
    pub pages_visited: u32,
    pub books_skipped: u64,
    pub images_saved: u64,
    pub images_failed: u64,
    pub failures: Vec<Failure>,
}

impl CategoryOutcome {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CategoryStatus::Failed,
            records: Vec::new(),
            pages_visited: 0,
            books_skipped: 0,
            images_saved: 0,
            images_failed: 0,
            failures: Vec::new(),
        }
    }

    pub fn cancelled(name: impl Into<String>) -> Self {
        Self {
            status: CategoryStatus::Cancelled,
            ..Self::new(name)
        }
    }
}

/// Summary of a whole crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub categories_found: u64,
    pub categories_written: u64,
    pub categories_failed: u64,
    pub categories_cancelled: u64,
    pub books_written: u64,
    pub books_skipped: u64,
    pub unrated_books: u64,
    pub images_saved: u64,
    pub images_failed: u64,
    pub cancelled: bool,
    pub failures: Vec<Failure>,
}

impl CrawlReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            categories_found: 0,
            categories_written: 0,
            categories_failed: 0,
            categories_cancelled: 0,
            books_written: 0,
            books_skipped: 0,
            unrated_books: 0,
            images_saved: 0,
            images_failed: 0,
            cancelled: false,
            failures: Vec::new(),
        }
    }

    /// Folds one category's outcome into the run totals
    pub fn absorb(&mut self, outcome: &CategoryOutcome) {
        match outcome.status {
            CategoryStatus::Written(_) => {
                self.categories_written += 1;
                self.books_written += outcome.records.len() as u64;
                self.unrated_books += outcome
                    .records
                    .iter()
                    .filter(|record| !record.rating.is_rated())
                    .count() as u64;
            }
            CategoryStatus::Failed => {
                self.categories_failed += 1;
                self.books_skipped += outcome.records.len() as u64;
            }
            CategoryStatus::Cancelled => self.categories_cancelled += 1,
        }
        self.books_skipped += outcome.books_skipped;
        self.images_saved += outcome.images_saved;
        self.images_failed += outcome.images_failed;
        self.failures.extend(outcome.failures.iter().cloned());
    }

    pub fn record_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = Some(finished_at);
    }

    /// Number of failures caused by unexpected document structure
    pub fn structural_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.structural).count()
    }

    /// True when the traversal finished without cancellation or structural failures
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.structural_failures() == 0
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints the run summary to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Summary ===\n");

    println!("Categories:");
    println!("  Found: {}", report.categories_found);
    println!("  Written: {}", report.categories_written);
    println!("  Failed: {}", report.categories_failed);
    if report.categories_cancelled > 0 {
        println!("  Cancelled: {}", report.categories_cancelled);
    }
    println!();

    println!("Books:");
    println!("  Written: {}", report.books_written);
    println!("  Skipped: {}", report.books_skipped);
    if report.unrated_books > 0 {
        println!("  Written with unrecognised rating: {}", report.unrated_books);
    }
    println!();

    if report.images_saved > 0 || report.images_failed > 0 {
        println!("Images:");
        println!("  Saved: {}", report.images_saved);
        println!("  Failed: {}", report.images_failed);
        println!();
    }

    if !report.failures.is_empty() {
        println!("Failures ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  - {}", failure);
        }
        println!();
    }

    if let Some(seconds) = report.duration_seconds() {
        println!("Duration: {}s", seconds);
    }
    if report.cancelled {
        println!("Run was cancelled before completion");
    }
}
