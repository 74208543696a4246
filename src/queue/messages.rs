//! Typed message schemas exchanged between pipeline stages

use crate::storage::SessionKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A request to crawl from one seed URL
///
/// Wire format: `{"url": "<string>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
}

/// Tells the execution trigger that a session's frontier is seeded
///
/// Wire format: `{"tableName": "<session key>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStart {
    #[serde(rename = "tableName")]
    pub table_name: SessionKey,
}

/// Input of the workflow's query step
///
/// Wire format: `{"tableName": "<session key>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStepInput {
    #[serde(rename = "tableName")]
    pub table_name: SessionKey,
}

/// Outcome of one query → extract → update wave
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveResult {
    pub wave: u32,
    /// Source URLs whose links were extracted
    pub visited: Vec<String>,
    /// Source URLs that failed extraction and were marked visited anyway
    pub skipped: Vec<String>,
    /// Newly discovered URLs written as not visited
    pub discovered: Vec<String>,
}

/// Serializes a message body
pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Parses a message body into its schema
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(body)
}
