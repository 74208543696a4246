//! Link extraction behind a trait so the workflow can run against any source

use crate::config::UserAgentConfig;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchError};
use crate::crawler::parser::extract_links;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Produces the outbound links of a page, one hop deep
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Vec<String>, FetchError>;
}

/// Fetches pages over HTTP and parses their anchors
pub struct HttpLinkExtractor {
    client: Client,
}

impl HttpLinkExtractor {
    /// Builds an extractor with the crawler's user agent
    pub fn new(config: &UserAgentConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(|e| FetchError::Network {
            url: String::new(),
            reason: format!("Failed to build HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LinkExtractor for HttpLinkExtractor {
    async fn extract(&self, url: &str) -> Result<Vec<String>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let page = fetch_page(&self.client, &parsed).await?;
        let links = extract_links(&page.body, &page.final_url);

        tracing::debug!("Extracted {} links from {}", links.len(), url);
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_extract_links_from_served_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><a href="/a">A</a><a href="b">B</a><a href="mailto:x@y.z">M</a></body></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let extractor = HttpLinkExtractor::new(&UserAgentConfig::default()).unwrap();
        let links = extractor.extract(&format!("{}/", server.uri())).await.unwrap();

        assert_eq!(
            links,
            vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())]
        );
    }

    #[tokio::test]
    async fn test_extract_invalid_url() {
        let extractor = HttpLinkExtractor::new(&UserAgentConfig::default()).unwrap();
        let result = extractor.extract("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_extract_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let extractor = HttpLinkExtractor::new(&UserAgentConfig::default()).unwrap();
        let result = extractor.extract(&server.uri()).await;

        assert!(matches!(result, Err(FetchError::Status { status: 500, .. })));
    }
}
