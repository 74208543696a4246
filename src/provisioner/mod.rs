//! Session provisioning
//!
//! Turns a crawl task into a ready-to-crawl session: a catalog row, a dedicated
//! frontier table holding the seed URL, and an execution-start message.

mod policy;

pub use policy::ProvisionPolicy;

use crate::queue::{decode, encode, CrawlTask, ExecutionStart, MessageHandler, MessageQueue};
use crate::state::SessionStatus;
use crate::storage::{Database, FrontierEntry, FrontierTables, SessionKey, SessionRecord};
use crate::url::{host_of, parse_absolute_url};
use crate::CrawlError;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;

/// SHA-256 hex digest identifying a crawl task across redeliveries
pub fn task_fingerprint(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Consumes crawl tasks and provisions one session per task
pub struct SessionProvisioner {
    db: Database,
    tables: Arc<dyn FrontierTables>,
    queue: Arc<dyn MessageQueue>,
    execution_queue: String,
    policy: ProvisionPolicy,
}

impl SessionProvisioner {
    /// Creates a provisioner
    ///
    /// # Arguments
    ///
    /// * `db` - Session catalog
    /// * `tables` - Where frontier tables are created and seeded
    /// * `queue` - Transport for execution-start messages
    /// * `execution_queue` - Name of the queue the execution launcher consumes
    /// * `policy` - Readiness backoff and redelivery window
    pub fn new(
        db: Database,
        tables: Arc<dyn FrontierTables>,
        queue: Arc<dyn MessageQueue>,
        execution_queue: impl Into<String>,
        policy: ProvisionPolicy,
    ) -> Self {
        Self {
            db,
            tables,
            queue,
            execution_queue: execution_queue.into(),
            policy,
        }
    }

    /// Provisions the session for one crawl task
    ///
    /// A task redelivered within the redelivery window resumes the session it
    /// already created if that session never got queued, and is otherwise a no-op
    /// returning the existing key. Sessions that failed do not block a new attempt.
    ///
    /// # Returns
    ///
    /// * `Ok(SessionKey)` - The session is seeded and its execution-start message sent
    /// * `Err(CrawlError::MalformedUrl)` - The task URL is not an absolute http(s) URL
    /// * `Err(CrawlError::ProvisioningTimeout)` - The table never became ready
    /// * `Err(CrawlError)` - Catalog, table or queue failure
    pub async fn handle(&self, task: &CrawlTask) -> Result<SessionKey, CrawlError> {
        let url = parse_absolute_url(&task.url).map_err(|e| CrawlError::MalformedUrl {
            url: task.url.clone(),
            reason: e.to_string(),
        })?;
        let host = host_of(&url).map_err(|e| CrawlError::MalformedUrl {
            url: task.url.clone(),
            reason: e.to_string(),
        })?;
        let seed_url = url.to_string();
        let fingerprint = task_fingerprint(&seed_url);
        let now = Utc::now();

        let key = match self.recent_session(&fingerprint, now.timestamp())? {
            Some(existing) if existing.status.is_resumable() => {
                tracing::info!(
                    "Resuming provisioning of {} for redelivered task {}",
                    existing.session_key,
                    seed_url
                );
                existing.session_key
            }
            Some(existing) if existing.status != SessionStatus::Failed => {
                tracing::info!(
                    "Task {} already provisioned as {} ({}), ignoring redelivery",
                    seed_url,
                    existing.session_key,
                    existing.status
                );
                return Ok(existing.session_key);
            }
            _ => {
                let base = SessionKey::derive(&host, now.timestamp());
                self.db.reserve_session(&base, &seed_url, &fingerprint, now)?
            }
        };

        if let Err(e) = self.provision(&key, &seed_url).await {
            if matches!(e, CrawlError::ProvisioningTimeout { .. }) {
                self.db.fail_session(&key, 0, &e.to_string())?;
            }
            return Err(e);
        }

        Ok(key)
    }

    fn recent_session(
        &self,
        fingerprint: &str,
        now_epoch: i64,
    ) -> Result<Option<SessionRecord>, CrawlError> {
        if self.policy.redelivery_window.is_zero() {
            return Ok(None);
        }
        let since = now_epoch - self.policy.redelivery_window.as_secs() as i64;
        Ok(self.db.find_recent_session(fingerprint, since)?)
    }

    async fn provision(&self, key: &SessionKey, seed_url: &str) -> Result<(), CrawlError> {
        self.tables.create_table(key)?;
        self.wait_until_ready(key).await?;

        self.tables
            .open_frontier(key)?
            .put(&FrontierEntry::not_visited(seed_url))?;
        self.db.update_session_status(key, SessionStatus::Seeded)?;
        tracing::debug!("Seeded {} with {}", key, seed_url);

        let message = encode(&ExecutionStart {
            table_name: key.clone(),
        })?;
        self.queue.send(&self.execution_queue, message).await?;
        self.db.update_session_status(key, SessionStatus::Queued)?;

        tracing::info!("Provisioned session {} for {}", key, seed_url);
        Ok(())
    }

    /// Polls table readiness with exponential backoff until the policy timeout
    async fn wait_until_ready(&self, key: &SessionKey) -> Result<(), CrawlError> {
        let started = Instant::now();
        let mut delay = self.policy.min_delay;

        loop {
            if self.tables.table_ready(key)? {
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= self.policy.timeout {
                return Err(CrawlError::ProvisioningTimeout {
                    session_key: key.to_string(),
                    waited_ms: elapsed.as_millis(),
                });
            }

            tokio::time::sleep(delay.min(self.policy.timeout - elapsed)).await;
            delay = self.policy.next_delay(delay);
        }
    }
}

#[async_trait]
impl MessageHandler for SessionProvisioner {
    async fn handle(&self, body: &str) -> Result<(), CrawlError> {
        let task: CrawlTask = decode(body)?;
        SessionProvisioner::handle(self, &task).await?;
        Ok(())
    }
}
