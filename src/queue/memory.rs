//! In-process queue transport

use crate::queue::{MessageQueue, QueueError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One delivery attempt of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub body: String,
    /// How many times this message has been handed to a consumer, including this one
    pub receive_count: u32,
}

/// A message that exhausted its deliveries or could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub queue: String,
    pub body: String,
    pub receive_count: u32,
    pub error: String,
}

/// Receive side of one declared queue
pub struct QueueReceiver {
    name: String,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

impl QueueReceiver {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next delivery; returns None once the queue is closed and drained
    pub async fn recv(&mut self) -> Option<Delivery> {
        let mut delivery = self.rx.recv().await?;
        delivery.receive_count += 1;
        Some(delivery)
    }
}

/// Named unbounded queues with redelivery and a dead-letter list
///
/// A consumer that fails a delivery hands it back through [`InMemoryBroker::redeliver`]
/// until it has been received `max_receive_count` times, after which it is
/// dead-lettered.
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, mpsc::UnboundedSender<Delivery>>>,
    dead_letters: Mutex<Vec<DeadLetter>>,
    max_receive_count: u32,
}

impl InMemoryBroker {
    pub fn new(max_receive_count: u32) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            dead_letters: Mutex::new(Vec::new()),
            max_receive_count: max_receive_count.max(1),
        }
    }

    pub fn max_receive_count(&self) -> u32 {
        self.max_receive_count
    }

    /// Declares a queue and returns its receiver
    ///
    /// Declaring an existing name replaces the previous receiver.
    pub fn declare(&self, name: &str) -> QueueReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut queues) = self.queues.lock() {
            queues.insert(name.to_string(), tx);
        }
        QueueReceiver {
            name: name.to_string(),
            rx,
        }
    }

    /// Stops accepting messages for a queue
    ///
    /// Its receiver still drains what was already sent, then yields None.
    pub fn close(&self, name: &str) {
        if let Ok(mut queues) = self.queues.lock() {
            queues.remove(name);
        }
    }

    /// Puts a failed delivery back on its queue, or dead-letters it
    ///
    /// Returns true if the message was requeued.
    pub fn redeliver(&self, queue: &str, delivery: Delivery, error: &str) -> bool {
        if delivery.receive_count >= self.max_receive_count {
            self.dead_letter(queue, delivery, error);
            return false;
        }

        let sender = self
            .queues
            .lock()
            .ok()
            .and_then(|queues| queues.get(queue).cloned());

        match sender {
            Some(tx) => match tx.send(delivery) {
                Ok(()) => true,
                Err(mpsc::error::SendError(delivery)) => {
                    self.dead_letter(queue, delivery, error);
                    false
                }
            },
            None => {
                self.dead_letter(queue, delivery, error);
                false
            }
        }
    }

    /// Moves a delivery to the dead-letter list
    pub fn dead_letter(&self, queue: &str, delivery: Delivery, error: &str) {
        tracing::error!(
            "Dead-lettering message on {} after {} deliveries: {}",
            queue,
            delivery.receive_count,
            error
        );
        if let Ok(mut dead_letters) = self.dead_letters.lock() {
            dead_letters.push(DeadLetter {
                queue: queue.to_string(),
                body: delivery.body,
                receive_count: delivery.receive_count,
                error: error.to_string(),
            });
        }
    }

    /// Returns a snapshot of all dead-lettered messages
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters
            .lock()
            .map(|dead_letters| dead_letters.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageQueue for InMemoryBroker {
    async fn send(&self, queue: &str, body: String) -> Result<(), QueueError> {
        let sender = self
            .queues
            .lock()
            .ok()
            .and_then(|queues| queues.get(queue).cloned())
            .ok_or_else(|| QueueError::UnknownQueue(queue.to_string()))?;

        sender
            .send(Delivery {
                body,
                receive_count: 0,
            })
            .map_err(|_| QueueError::Closed(queue.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let broker = InMemoryBroker::new(3);
        let mut rx = broker.declare("tasks");

        broker.send("tasks", "hello".to_string()).await.unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.body, "hello");
        assert_eq!(delivery.receive_count, 1);
    }

    #[tokio::test]
    async fn test_send_to_unknown_queue() {
        let broker = InMemoryBroker::new(3);
        let result = broker.send("missing", "hello".to_string()).await;
        assert_eq!(result, Err(QueueError::UnknownQueue("missing".to_string())));
    }

    #[tokio::test]
    async fn test_redeliver_until_max_receive_count() {
        let broker = InMemoryBroker::new(2);
        let mut rx = broker.declare("tasks");
        broker.send("tasks", "body".to_string()).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert!(broker.redeliver("tasks", first, "boom"));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.receive_count, 2);
        assert!(!broker.redeliver("tasks", second, "boom again"));

        let dead = broker.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].body, "body");
        assert_eq!(dead[0].receive_count, 2);
        assert_eq!(dead[0].error, "boom again");
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let broker = InMemoryBroker::new(1);
        let mut rx = broker.declare("tasks");
        broker.send("tasks", "last".to_string()).await.unwrap();

        broker.close("tasks");

        assert_eq!(rx.recv().await.unwrap().body, "last");
        assert!(rx.recv().await.is_none());
        assert!(broker.send("tasks", "late".to_string()).await.is_err());
    }
}
