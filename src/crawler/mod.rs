//! Crawler module: page fetching, link extraction and the crawl workflow
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of HTML pages
//! - HTML parsing and link extraction
//! - The wave-by-wave workflow that drains a session's frontier
//! - Launching one workflow execution per seeded session

mod extractor;
mod fetcher;
mod launcher;
mod parser;
pub mod workflow;

pub use extractor::{HttpLinkExtractor, LinkExtractor};
pub use fetcher::{build_http_client, fetch_page, is_html_content_type, FetchError, FetchedPage};
pub use launcher::ExecutionLauncher;
pub use parser::extract_links;
pub use workflow::{
    CrawlWorkflow, ExecutionContext, WorkflowConfig, WorkflowReport, WorkflowState,
};
