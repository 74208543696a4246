//! Ingestion gate
//!
//! Validates inbound crawl requests and enqueues them as crawl tasks. The HTTP
//! surface lives in [`http`]; this module holds the transport-independent logic.

pub mod http;

use crate::queue::{encode, CrawlTask, MessageQueue};
use crate::url::parse_absolute_url;
use crate::ValidationError;
use std::sync::Arc;

/// Body returned when a task was enqueued
pub const TASK_QUEUED: &str = "Task Queued!";

/// Status and plain-text body answered to a kickoff request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub status: u16,
    pub body: String,
}

impl GateResponse {
    fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Parses and validates a kickoff request body
///
/// The body must be a JSON object with a non-empty string `url` that parses as an
/// absolute http(s) URL with a host.
///
/// # Example
///
/// ```
/// use wavecrawl::gate::validate_request;
/// use wavecrawl::ValidationError;
///
/// let task = validate_request(r#"{"url": "http://google.pl"}"#).unwrap();
/// assert_eq!(task.url, "http://google.pl");
/// assert_eq!(validate_request(r#"{"url": "http://"}"#), Err(ValidationError::MalformedUrl));
/// ```
pub fn validate_request(body: &str) -> Result<CrawlTask, ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyBody);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::InvalidJson("expected a JSON object".to_string()))?;

    let url = object
        .get("url")
        .and_then(|url| url.as_str())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ValidationError::MissingUrl)?;

    parse_absolute_url(url).map_err(|_| ValidationError::MalformedUrl)?;

    Ok(CrawlTask {
        url: url.to_string(),
    })
}

/// Accepts crawl requests and forwards them to the crawl-task queue
pub struct IngestionGate {
    queue: Arc<dyn MessageQueue>,
    task_queue: String,
}

impl IngestionGate {
    pub fn new(queue: Arc<dyn MessageQueue>, task_queue: impl Into<String>) -> Self {
        Self {
            queue,
            task_queue: task_queue.into(),
        }
    }

    /// Handles one kickoff request body
    ///
    /// | Outcome | Status | Body |
    /// |---------|--------|------|
    /// | Task enqueued | 200 | `Task Queued!` |
    /// | Validation failure | 400 | The validation message |
    /// | Queue failure | 500 | The queue error |
    ///
    /// The task is sent at most once; queue failures are not retried.
    pub async fn handle(&self, body: &str) -> GateResponse {
        let task = match validate_request(body) {
            Ok(task) => task,
            Err(e) => {
                tracing::debug!("Rejected kickoff request: {}", e);
                return GateResponse::new(400, e.to_string());
            }
        };

        let message = match encode(&task) {
            Ok(message) => message,
            Err(e) => return GateResponse::new(500, e.to_string()),
        };

        match self.queue.send(&self.task_queue, message).await {
            Ok(()) => {
                tracing::info!("Queued crawl task for {}", task.url);
                GateResponse::new(200, TASK_QUEUED)
            }
            Err(e) => {
                tracing::error!("Failed to queue crawl task for {}: {}", task.url, e);
                GateResponse::new(500, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{decode, QueueError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingQueue {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageQueue for RecordingQueue {
        async fn send(&self, queue: &str, body: String) -> Result<(), QueueError> {
            self.sent.lock().unwrap().push((queue.to_string(), body));
            Ok(())
        }
    }

    struct ClosedQueue;

    #[async_trait]
    impl MessageQueue for ClosedQueue {
        async fn send(&self, queue: &str, _body: String) -> Result<(), QueueError> {
            Err(QueueError::Closed(queue.to_string()))
        }
    }

    #[test]
    fn test_validate_request_rejections() {
        assert_eq!(validate_request(""), Err(ValidationError::EmptyBody));
        assert_eq!(validate_request("   "), Err(ValidationError::EmptyBody));
        assert_eq!(validate_request("{}"), Err(ValidationError::MissingUrl));
        assert_eq!(
            validate_request(r#"{"url": ""}"#),
            Err(ValidationError::MissingUrl)
        );
        assert_eq!(
            validate_request(r#"{"url": 42}"#),
            Err(ValidationError::MissingUrl)
        );
        assert_eq!(
            validate_request(r#"{"url": "http://"}"#),
            Err(ValidationError::MalformedUrl)
        );
        assert_eq!(
            validate_request(r#"{"url": "ftp://example.com/"}"#),
            Err(ValidationError::MalformedUrl)
        );
        assert!(matches!(
            validate_request("not json"),
            Err(ValidationError::InvalidJson(_))
        ));
        assert!(matches!(
            validate_request(r#"["http://google.pl"]"#),
            Err(ValidationError::InvalidJson(_))
        ));
    }

    #[tokio::test]
    async fn test_valid_request_is_queued_once() {
        let queue = Arc::new(RecordingQueue::default());
        let gate = IngestionGate::new(queue.clone(), "crawl-tasks");

        let response = gate.handle(r#"{"url": "http://google.pl"}"#).await;

        assert_eq!(response, GateResponse::new(200, TASK_QUEUED));
        let sent = queue.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "crawl-tasks");
        let task: CrawlTask = decode(&sent[0].1).unwrap();
        assert_eq!(task.url, "http://google.pl");
    }

    #[tokio::test]
    async fn test_missing_url_is_bad_request() {
        let queue = Arc::new(RecordingQueue::default());
        let gate = IngestionGate::new(queue.clone(), "crawl-tasks");

        let response = gate.handle("").await;

        assert_eq!(response.status, 400);
        assert_eq!(response.body, "url not found within the body");
        assert!(queue.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_url_is_bad_request() {
        let queue = Arc::new(RecordingQueue::default());
        let gate = IngestionGate::new(queue.clone(), "crawl-tasks");

        let response = gate.handle(r#"{"url": "http://"}"#).await;

        assert_eq!(response.status, 400);
        assert_eq!(response.body, "url is malformed");
        assert!(queue.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_failure_is_server_error() {
        let gate = IngestionGate::new(Arc::new(ClosedQueue), "crawl-tasks");

        let response = gate.handle(r#"{"url": "https://example.com/"}"#).await;

        assert_eq!(response.status, 500);
        assert!(response.body.contains("crawl-tasks"));
    }
}
