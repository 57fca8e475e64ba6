use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Bookshelf-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Catalog page carrying the category navigation block
    pub root_url: String,

    /// Maximum number of detail/image fetches in flight across the whole run
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Number of categories processed at the same time
    #[serde(default = "default_concurrent_categories")]
    pub concurrent_categories: u32,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Follow `page-N.html` listings past the first page
    #[serde(default = "default_true")]
    pub follow_pagination: bool,

    /// Save each book's cover image next to its category CSV
    #[serde(default)]
    pub download_images: bool,

    /// Hard upper bound on listing pages walked for one category
    #[serde(default = "default_max_pages_per_category")]
    pub max_pages_per_category: u32,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory holding one sub-directory per category
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Path of the per-category aggregate CSV
    #[serde(default = "default_aggregate_path")]
    pub aggregate_path: PathBuf,

    /// Render the pie and bar charts after aggregation
    #[serde(default = "default_true")]
    pub render_charts: bool,

    /// Directory the chart images are written to
    #[serde(default = "default_charts_dir")]
    pub charts_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            aggregate_path: default_aggregate_path(),
            render_charts: true,
            charts_dir: default_charts_dir(),
        }
    }
}

fn default_max_concurrent_fetches() -> u32 {
    8
}

fn default_concurrent_categories() -> u32 {
    1
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_pages_per_category() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_aggregate_path() -> PathBuf {
    PathBuf::from("books_details_by_category.csv")
}

fn default_charts_dir() -> PathBuf {
    PathBuf::from(".")
}
