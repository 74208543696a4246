//! Starts one workflow execution per seeded session

use crate::crawler::workflow::{CrawlWorkflow, ExecutionContext, WorkflowReport, WorkflowState};
use crate::queue::{decode, ExecutionStart, MessageHandler};
use crate::state::{SessionStatus, StopReason};
use crate::storage::{Database, SessionKey, StoreError};
use crate::CrawlError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Consumes execution-start messages and runs the crawl workflow
///
/// Execution names are unique per session: a second start for a session that
/// is already running or finished is acknowledged without launching anything.
pub struct ExecutionLauncher {
    db: Database,
    workflow: Arc<CrawlWorkflow>,
    definition: String,
    /// Sessions whose execution is in flight
    started: Arc<Mutex<HashSet<SessionKey>>>,
}

impl ExecutionLauncher {
    pub fn new(db: Database, workflow: Arc<CrawlWorkflow>, definition: impl Into<String>) -> Self {
        Self {
            db,
            workflow,
            definition: definition.into(),
            started: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Name of the execution started for a session
    pub fn execution_name(&self, key: &SessionKey) -> String {
        format!("{}:{}", self.definition, key)
    }

    /// Launches the workflow for a session
    ///
    /// # Returns
    ///
    /// * `Ok(Some(handle))` - The execution was started; the handle yields its report
    /// * `Ok(None)` - The session already has an execution
    /// * `Err(CrawlError)` - The session is unknown or its status could not be updated
    pub fn launch(
        &self,
        start: ExecutionStart,
    ) -> Result<Option<JoinHandle<WorkflowReport>>, CrawlError> {
        let key = start.table_name.clone();
        let name = self.execution_name(&key);

        let session = self
            .db
            .get_session(&key)?
            .ok_or_else(|| StoreError::SessionNotFound(key.to_string()))?;

        if matches!(
            session.status,
            SessionStatus::Running | SessionStatus::Completed | SessionStatus::Failed
        ) {
            tracing::info!("Execution {} already exists ({}), ignoring", name, session.status);
            return Ok(None);
        }

        {
            let mut started = self.started.lock().map_err(|_| StoreError::Poisoned)?;
            if !started.insert(key.clone()) {
                tracing::info!("Execution {} already started, ignoring", name);
                return Ok(None);
            }
        }

        if let Err(e) = self.db.update_session_status(&key, SessionStatus::Running) {
            if let Ok(mut started) = self.started.lock() {
                started.remove(&key);
            }
            return Err(e.into());
        }

        tracing::info!("Starting execution {}", name);

        let db = self.db.clone();
        let workflow = self.workflow.clone();
        let started = self.started.clone();
        let ctx = ExecutionContext::from(start);
        let handle = tokio::spawn(async move {
            let report = workflow.run(ctx).await;
            record_outcome(&db, &report);
            // The catalog status now blocks a relaunch on its own
            if let Ok(mut started) = started.lock() {
                started.remove(&report.session_key);
            }
            report
        });

        Ok(Some(handle))
    }
}

fn record_outcome(db: &Database, report: &WorkflowReport) {
    let result = match &report.state {
        WorkflowState::Failed(error) => db.fail_session(&report.session_key, report.waves, error),
        _ => db.complete_session(
            &report.session_key,
            report.waves,
            report.stop_reason.unwrap_or(StopReason::FrontierExhausted),
        ),
    };

    if let Err(e) = result {
        tracing::error!(
            "Failed to record outcome of {}: {}",
            report.session_key,
            e
        );
    }
}

#[async_trait]
impl MessageHandler for ExecutionLauncher {
    async fn handle(&self, body: &str) -> Result<(), CrawlError> {
        let start: ExecutionStart = decode(body)?;
        self.launch(start)?;
        Ok(())
    }
}
