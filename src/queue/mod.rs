//! Message queue module
//!
//! Pipeline stages talk to each other only through named queues with
//! at-least-once delivery:
//! - `MessageQueue`: the send side every stage depends on
//! - `InMemoryBroker`: an in-process transport with redelivery and dead letters
//! - `consume`: the receive loop that drives a stage from a queue
//! - typed message schemas decoded at the queue boundary

mod consumer;
mod memory;
mod messages;

pub use consumer::{consume, MessageHandler};
pub use memory::{DeadLetter, Delivery, InMemoryBroker, QueueReceiver};
pub use messages::{decode, encode, CrawlTask, ExecutionStart, QueryStepInput, WaveResult};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a queue transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("Queue closed: {0}")]
    Closed(String),
}

/// Send side of a queue transport
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Sends one message body to the named queue
    ///
    /// Delivery is at-least-once: consumers must tolerate duplicates.
    async fn send(&self, queue: &str, body: String) -> Result<(), QueueError>;
}
