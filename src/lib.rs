//! Bookshelf-Crawl: a catalog crawler for book listing sites
//!
//! This crate walks the category navigation of a book catalog, follows each
//! category's paginated listing, extracts every book detail page, and writes
//! per-category CSV files together with a per-category price aggregate.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Bookshelf-Crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Structure(#[from] StructureError),

    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Crawl cancelled")]
    Cancelled,
}

impl CrawlError {
    /// Returns true if this error means the site layout no longer matches the extractor
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structure(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// A network fetch that did not produce a usable body
#[derive(Debug, Error)]
#[error("Fetch failed for {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(url: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            url: url.into(),
            cause,
        }
    }
}

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed")]
    Connect,

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("{0}")]
    Transport(String),
}

/// The document did not have the shape the extractor expects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("Missing {block} on {url}")]
    MissingBlock { url: String, block: &'static str },

    #[error("Missing field '{field}' on {url}")]
    MissingField { url: String, field: &'static str },

    #[error("Invalid value {value:?} for field '{field}' on {url}")]
    InvalidField {
        url: String,
        field: &'static str,
        value: String,
    },

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Failure writing crawl output to disk
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error at {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Malformed row at {}:{line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Bookshelf-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlReport};
pub use model::{BookRecord, BookRef, CategoryRef, CategoryStats, Rating};
