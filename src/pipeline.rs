//! Wires the stages into a running pipeline
//!
//! ```text
//! gate ─▶ [crawl tasks] ─▶ provisioner ─▶ [executions] ─▶ launcher ─▶ workflow
//! ```
//!
//! Each queue gets one consumer task on the tokio runtime.

use crate::config::Config;
use crate::crawler::{
    CrawlWorkflow, ExecutionLauncher, HttpLinkExtractor, LinkExtractor, WorkflowConfig,
};
use crate::gate::IngestionGate;
use crate::provisioner::{task_fingerprint, ProvisionPolicy, SessionProvisioner};
use crate::queue::{consume, DeadLetter, InMemoryBroker, MessageQueue};
use crate::state::SessionStatus;
use crate::storage::{Database, SessionRecord};
use crate::url::parse_absolute_url;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A running pipeline
pub struct Pipeline {
    db: Database,
    broker: Arc<InMemoryBroker>,
    gate: Arc<IngestionGate>,
    task_queue: String,
    execution_queue: String,
    redelivery_window: Duration,
    consumers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Starts a pipeline fetching pages over HTTP
    pub fn start(config: &Config, db: Database) -> Result<Self, CrawlError> {
        let extractor = Arc::new(HttpLinkExtractor::new(&config.user_agent)?);
        Ok(Self::start_with_extractor(config, db, extractor))
    }

    /// Starts a pipeline with a custom link extractor
    pub fn start_with_extractor(
        config: &Config,
        db: Database,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        let broker = Arc::new(InMemoryBroker::new(config.queues.max_receive_count));
        let queue: Arc<dyn MessageQueue> = broker.clone();
        let task_queue = config.queues.crawl_tasks.clone();
        let execution_queue = config.queues.executions.clone();

        let task_receiver = broker.declare(&task_queue);
        let execution_receiver = broker.declare(&execution_queue);

        let gate = Arc::new(IngestionGate::new(queue.clone(), task_queue.clone()));

        let policy = ProvisionPolicy::from(&config.provisioning);
        let redelivery_window = policy.redelivery_window;
        let provisioner = Arc::new(SessionProvisioner::new(
            db.clone(),
            Arc::new(db.clone()),
            queue,
            execution_queue.clone(),
            policy,
        ));

        let workflow = Arc::new(CrawlWorkflow::new(
            Arc::new(db.clone()),
            extractor,
            WorkflowConfig::from(&config.workflow),
        ));
        let launcher = Arc::new(ExecutionLauncher::new(
            db.clone(),
            workflow,
            config.workflow.definition.clone(),
        ));

        let consumers = vec![
            tokio::spawn(consume(broker.clone(), task_receiver, provisioner)),
            tokio::spawn(consume(broker.clone(), execution_receiver, launcher)),
        ];

        tracing::info!(
            "Pipeline started (crawl tasks: {}, executions: {})",
            task_queue,
            execution_queue
        );

        Self {
            db,
            broker,
            gate,
            task_queue,
            execution_queue,
            redelivery_window,
            consumers,
        }
    }

    pub fn gate(&self) -> Arc<IngestionGate> {
        self.gate.clone()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Messages that exhausted their deliveries
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.broker.dead_letters()
    }

    /// Waits until the session serving a kickoff of `seed_url` reaches a terminal status
    ///
    /// `submitted_at` is when the kickoff went through the gate. Only sessions the
    /// provisioner can resolve that task to are considered: ones created at or after
    /// submission, and unfailed ones recent enough for the task to be deduplicated
    /// onto. Older crawls of the same seed are ignored.
    ///
    /// Returns None if no such session finished before `timeout`.
    pub async fn wait_for_session(
        &self,
        seed_url: &str,
        submitted_at: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<Option<SessionRecord>, CrawlError> {
        let seed = parse_absolute_url(seed_url)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| seed_url.to_string());
        let fingerprint = task_fingerprint(&seed);
        let since = submitted_at.timestamp() - self.redelivery_window.as_secs() as i64;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(session) = self.db.find_recent_session(&fingerprint, since)? {
                if serves_submission(&session, submitted_at, !self.redelivery_window.is_zero())
                    && session.status.is_terminal()
                {
                    return Ok(Some(session));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(SESSION_POLL_INTERVAL).await;
        }
    }

    /// Closes both queues and waits for their consumers to drain
    ///
    /// Workflow executions already launched keep running on the runtime.
    pub async fn shutdown(self) {
        self.broker.close(&self.task_queue);
        self.broker.close(&self.execution_queue);

        for consumer in self.consumers {
            if let Err(e) = consumer.await {
                tracing::error!("Queue consumer panicked: {}", e);
            }
        }
        tracing::info!("Pipeline stopped");
    }
}

/// Whether a kickoff submitted at `submitted_at` resolves to `session`
///
/// A session that had already failed before submission never serves it; the
/// provisioner starts a fresh one instead.
fn serves_submission(session: &SessionRecord, submitted_at: DateTime<Utc>, dedupe: bool) -> bool {
    if session.created_epoch >= submitted_at.timestamp() {
        return true;
    }
    if !dedupe {
        return false;
    }
    if session.status != SessionStatus::Failed {
        return true;
    }
    session
        .finished_at
        .as_deref()
        .and_then(|finished| DateTime::parse_from_rfc3339(finished).ok())
        .is_some_and(|finished| finished.with_timezone(&Utc) >= submitted_at)
}
