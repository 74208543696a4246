//! Queue consumer loop

use crate::queue::{InMemoryBroker, QueueReceiver};
use crate::CrawlError;
use async_trait::async_trait;
use std::sync::Arc;

/// A pipeline stage triggered by queue messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one message body
    ///
    /// Returning an error hands the message back to the transport for redelivery.
    async fn handle(&self, body: &str) -> Result<(), CrawlError>;
}

/// Feeds every delivery on `receiver` to `handler` until the queue closes
///
/// Failed deliveries are redelivered up to the broker's receive limit. Errors that
/// are not retryable, such as undecodable bodies or malformed URLs, dead-letter the
/// message on first failure.
pub async fn consume<H>(broker: Arc<InMemoryBroker>, mut receiver: QueueReceiver, handler: Arc<H>)
where
    H: MessageHandler + ?Sized,
{
    let queue = receiver.name().to_string();
    tracing::debug!("Consumer started for queue {}", queue);

    while let Some(delivery) = receiver.recv().await {
        match handler.handle(&delivery.body).await {
            Ok(()) => {
                tracing::debug!("Handled message on {}", queue);
            }
            Err(e) if !e.is_retryable() => {
                broker.dead_letter(&queue, delivery, &e.to_string());
            }
            Err(e) => {
                let message = e.to_string();
                let receive_count = delivery.receive_count;
                if broker.redeliver(&queue, delivery, &message) {
                    tracing::warn!(
                        "Delivery {} on {} failed, requeued: {}",
                        receive_count,
                        queue,
                        message
                    );
                }
            }
        }
    }

    tracing::debug!("Consumer stopped for queue {}", queue);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MessageQueue;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingHandler {
        calls: AtomicU32,
        fail_times: u32,
    }

    #[async_trait]
    impl MessageHandler for FailingHandler {
        async fn handle(&self, body: &str) -> Result<(), CrawlError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if body == "garbage" {
                return Err(CrawlError::Serialization(
                    serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
                ));
            }
            if call <= self.fail_times {
                return Err(CrawlError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "transient",
                )));
            }
            Ok(())
        }
    }

    async fn run(fail_times: u32, body: &str, max_receive_count: u32) -> (u32, usize) {
        let broker = Arc::new(InMemoryBroker::new(max_receive_count));
        let receiver = broker.declare("q");
        let handler = Arc::new(FailingHandler {
            calls: AtomicU32::new(0),
            fail_times,
        });

        broker.send("q", body.to_string()).await.unwrap();
        let task = tokio::spawn(consume(broker.clone(), receiver, handler.clone()));

        // Give the consumer time to work through redeliveries, then stop it
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        broker.close("q");
        task.await.unwrap();

        (
            handler.calls.load(Ordering::SeqCst),
            broker.dead_letters().len(),
        )
    }

    #[tokio::test]
    async fn test_transient_failure_is_redelivered() {
        let (calls, dead) = run(1, "ok", 3).await;
        assert_eq!(calls, 2);
        assert_eq!(dead, 0);
    }

    #[tokio::test]
    async fn test_persistent_failure_is_dead_lettered() {
        let (calls, dead) = run(10, "ok", 3).await;
        assert_eq!(calls, 3);
        assert_eq!(dead, 1);
    }

    #[tokio::test]
    async fn test_undecodable_message_is_dead_lettered_immediately() {
        let (calls, dead) = run(0, "garbage", 3).await;
        assert_eq!(calls, 1);
        assert_eq!(dead, 1);
    }
}
