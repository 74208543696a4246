//! HTTP fetcher implementation
//!
//! This module handles the page requests made by the link extractor:
//! - Building HTTP clients with proper user agent strings
//! - GET requests that only accept HTML responses
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Reasons a page could not be fetched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Request timeout for {0}")]
    Timeout(String),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Not HTML ({content_type}) at {url}")]
    NotHtml { url: String, content_type: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    pub status_code: u16,
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use wavecrawl::config::UserAgentConfig;
/// use wavecrawl::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if a Content-Type header value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Fetches a page and returns its body if it is HTML
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML content type | `Ok(FetchedPage)` |
/// | Any other status | `FetchError::Status` |
/// | Missing or non-HTML content type | `FetchError::NotHtml` |
/// | Timeout | `FetchError::Timeout` |
/// | Connection or body read failure | `FetchError::Network` |
///
/// Redirects are followed by the client; `final_url` is where they ended.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html_content_type(&content_type) {
        return Err(FetchError::NotHtml {
            url: url.to_string(),
            content_type,
        });
    }

    let body = response.text().await.map_err(|e| classify_error(url, e))?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body,
    })
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            reason: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

impl FetchError {
    /// True for failures another attempt might not reproduce
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout(_) => true,
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            FetchError::NotHtml { .. } | FetchError::InvalidUrl(_) => false,
        }
    }
}
