//! Wavecrawl: a breadth-first crawl pipeline driven by queues and per-session frontiers
//!
//! A seed URL enters through the ingestion gate, a provisioner gives it a dedicated
//! frontier table, and a workflow expands that frontier wave by wave until no
//! unvisited URLs remain.

pub mod config;
pub mod crawler;
pub mod gate;
pub mod output;
pub mod pipeline;
pub mod provisioner;
pub mod queue;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Wavecrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed URL {url}: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("Frontier table {session_key} was not ready after {waited_ms}ms")]
    ProvisioningTimeout { session_key: String, waited_ms: u128 },

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// False for errors that redelivering the same message cannot fix
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            CrawlError::Validation(_) | CrawlError::MalformedUrl { .. } | CrawlError::Serialization(_)
        )
    }
}

/// Rejections produced by the ingestion gate
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("url not found within the body")]
    EmptyBody,

    #[error("invalid request body: {0}")]
    InvalidJson(String),

    #[error("url not found within the body")]
    MissingUrl,

    #[error("url is malformed")]
    MalformedUrl,
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

    #[error("Missing required setting {key} (set it in the config file or via {env})")]
    Missing { key: &'static str, env: &'static str },
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Wavecrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{FrontierStatus, SessionStatus};
pub use storage::{Database, FrontierEntry, SessionKey};
