//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the per-run HTTP client with a proper user agent string
//! - GET requests for listing, detail, and image URLs
//! - Error classification into `FetchCause`
//!
//! Callers only see the [`Fetcher`] trait, so any retry policy belongs in an
//! implementation of it rather than in the pipeline stages.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::{FetchCause, FetchError};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use url::Url;

/// A fetched HTML document
///
/// The raw body is kept instead of a parsed tree because `scraper::Html`
/// cannot cross an `.await`; extraction parses it on demand.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL the page was served from, used to resolve relative links
    pub url: Url,
    pub body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    /// Parses the body into a queryable HTML tree
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Source of pages and binary resources
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the raw bytes at `url`
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError>;

    /// Fetches `url` as an HTML page
    async fn fetch_page(&self, url: &Url) -> Result<Page, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(Page::new(
            url.clone(),
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Supplies the request and connect timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(crawler.request_timeout())
        .connect_timeout(crawler.connect_timeout())
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a single shared `reqwest::Client`
///
/// The client is constructed once per run and only read afterwards, so the
/// fetcher can be shared by reference between all workers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, crawler)?))
    }
}

impl HttpFetcher {
    /// Sends a GET and rejects non-success statuses
    async fn get(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        tracing::trace!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::new(url.as_str(), classify_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                url.as_str(),
                FetchCause::Status(status.as_u16()),
            ));
        }

        if response.url() != url {
            tracing::debug!("{} redirected to {}", url, response.url());
        }
        Ok(response)
    }
}

fn body_error(url: &Url, error: reqwest::Error) -> FetchError {
    let cause = if error.is_timeout() {
        FetchCause::Timeout
    } else {
        FetchCause::Body(error.to_string())
    };
    FetchError::new(url.as_str(), cause)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| body_error(url, e))?;
        Ok(bytes.to_vec())
    }

    /// Fetches `url`, keeping the post-redirect URL as the page's base
    async fn fetch_page(&self, url: &Url) -> Result<Page, FetchError> {
        let response = self.get(url).await?;
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| body_error(url, e))?;
        Ok(Page::new(final_url, body))
    }
}

/// Maps a transport error onto a `FetchCause`
fn classify_error(error: &reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Timeout
    } else if error.is_connect() {
        FetchCause::Connect
    } else if let Some(status) = error.status() {
        FetchCause::Status(status.as_u16())
    } else {
        FetchCause::Transport(error.to_string())
    }
}
