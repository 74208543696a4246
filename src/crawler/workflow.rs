//! Breadth-first crawl workflow
//!
//! One execution expands one session's frontier in waves:
//!
//! ```text
//! Querying ──(batch)──▶ Extracting ──▶ Updating ──▶ Querying
//!    │                      │              │
//!    └──(empty/budget)──▶ Done       (store error)──▶ Failed
//! ```
//!
//! Every step re-opens the frontier from the session key carried in the
//! [`ExecutionContext`], so no step holds state that outlives it.

use crate::config::WorkflowSettings;
use crate::crawler::extractor::LinkExtractor;
use crate::crawler::fetcher::FetchError;
use crate::queue::{ExecutionStart, QueryStepInput, WaveResult};
use crate::state::StopReason;
use crate::storage::{FrontierEntry, FrontierStore, FrontierTables, SessionKey};
use crate::url::parse_absolute_url;
use crate::CrawlError;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Immutable input threaded through every step of one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    session_key: SessionKey,
}

impl ExecutionContext {
    pub fn new(session_key: SessionKey) -> Self {
        Self { session_key }
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// Input for the query step of this execution
    pub fn query_input(&self) -> QueryStepInput {
        QueryStepInput {
            table_name: self.session_key.clone(),
        }
    }
}

impl From<ExecutionStart> for ExecutionContext {
    fn from(start: ExecutionStart) -> Self {
        Self::new(start.table_name)
    }
}

/// Current position of an execution in the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Querying,
    Extracting(Vec<String>),
    Updating(WaveResult),
    Done,
    Failed(String),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed(_))
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Querying => write!(f, "querying"),
            WorkflowState::Extracting(batch) => write!(f, "extracting ({} urls)", batch.len()),
            WorkflowState::Updating(result) => write!(f, "updating (wave {})", result.wave),
            WorkflowState::Done => write!(f, "done"),
            WorkflowState::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

/// Tunables for one workflow execution
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Maximum unvisited URLs pulled per wave
    pub batch_limit: usize,
    /// Maximum concurrent extractions within a wave
    pub max_concurrency: usize,
    pub max_waves: u32,
    pub max_duration: Option<Duration>,
    /// Extra attempts for transient extraction failures
    pub fetch_retries: u32,
    pub retry_delay: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::from(&WorkflowSettings::default())
    }
}

impl From<&WorkflowSettings> for WorkflowConfig {
    fn from(settings: &WorkflowSettings) -> Self {
        Self {
            batch_limit: settings.batch_limit,
            max_concurrency: settings.max_concurrency,
            max_waves: settings.max_waves,
            max_duration: settings.max_duration_secs.map(Duration::from_secs),
            fetch_retries: settings.fetch_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }
}

/// Summary of a finished execution
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub session_key: SessionKey,
    pub waves: u32,
    /// Source URLs marked visited, including skipped ones
    pub visited: u64,
    /// Source URLs whose extraction failed
    pub skipped: u64,
    /// URLs written to the frontier as not visited
    pub discovered: u64,
    /// Set when the execution reached Done
    pub stop_reason: Option<StopReason>,
    /// Terminal state, Done or Failed
    pub state: WorkflowState,
}

impl WorkflowReport {
    pub fn is_success(&self) -> bool {
        self.state == WorkflowState::Done
    }
}

/// Runs crawl executions against a set of frontier tables
pub struct CrawlWorkflow {
    tables: Arc<dyn FrontierTables>,
    extractor: Arc<dyn LinkExtractor>,
    config: WorkflowConfig,
}

impl CrawlWorkflow {
    pub fn new(
        tables: Arc<dyn FrontierTables>,
        extractor: Arc<dyn LinkExtractor>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            tables,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn frontier(&self, key: &SessionKey) -> Result<Box<dyn FrontierStore>, CrawlError> {
        Ok(self.tables.open_frontier(key)?)
    }

    /// Query step: the next batch of unvisited URLs
    ///
    /// # Returns
    ///
    /// * `Ok(Some(urls))` - At most `batch_limit` URLs, never empty
    /// * `Ok(None)` - The frontier is exhausted
    /// * `Err(CrawlError)` - The frontier could not be read
    pub fn query_step(&self, input: &QueryStepInput) -> Result<Option<Vec<String>>, CrawlError> {
        let urls = self
            .frontier(&input.table_name)?
            .query_unvisited(self.config.batch_limit)?;

        if urls.is_empty() {
            Ok(None)
        } else {
            Ok(Some(urls))
        }
    }

    /// Extract step: pull links out of every URL in the batch
    ///
    /// Each source URL is marked visited whether or not extraction succeeded;
    /// failures are only recorded as skipped.
    pub async fn extract_step(
        &self,
        ctx: &ExecutionContext,
        wave: u32,
        batch: Vec<String>,
    ) -> Result<WaveResult, CrawlError> {
        let extractions: Vec<_> = batch
            .into_iter()
            .map(|url| self.extract_with_retries(url))
            .collect();
        let outcomes: Vec<(String, Result<Vec<String>, FetchError>)> = stream::iter(extractions)
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let frontier = self.frontier(ctx.session_key())?;
        let mut result = WaveResult {
            wave,
            ..WaveResult::default()
        };
        let mut discovered = BTreeSet::new();

        for (url, outcome) in outcomes {
            frontier.mark_visited(&url)?;
            match outcome {
                Ok(links) => {
                    discovered.extend(links);
                    result.visited.push(url);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", url, e);
                    result.skipped.push(url);
                }
            }
        }

        result.visited.sort();
        result.skipped.sort();
        result.discovered = discovered.into_iter().collect();
        Ok(result)
    }

    /// Update step: write discovered URLs to the frontier as not visited
    ///
    /// Returns the wave result with `discovered` narrowed to the URLs that were
    /// well-formed and written.
    pub fn update_step(
        &self,
        ctx: &ExecutionContext,
        mut result: WaveResult,
    ) -> Result<WaveResult, CrawlError> {
        let frontier = self.frontier(ctx.session_key())?;
        let mut written = Vec::with_capacity(result.discovered.len());

        for url in result.discovered {
            if let Err(e) = parse_absolute_url(&url) {
                tracing::debug!("Dropping malformed link {}: {}", url, e);
                continue;
            }
            frontier.put(&FrontierEntry::not_visited(url.as_str()))?;
            written.push(url);
        }

        result.discovered = written;
        Ok(result)
    }

    async fn extract_with_retries(&self, url: String) -> (String, Result<Vec<String>, FetchError>) {
        let mut attempt = 0;
        loop {
            match self.extractor.extract(&url).await {
                Ok(links) => return (url, Ok(links)),
                Err(e) if e.is_transient() && attempt < self.config.fetch_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Extraction attempt {} for {} failed, retrying: {}",
                        attempt,
                        url,
                        e
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return (url, Err(e)),
            }
        }
    }

    /// Runs an execution until its frontier is exhausted, a budget is hit, or a
    /// store operation fails
    pub async fn run(&self, ctx: ExecutionContext) -> WorkflowReport {
        let started = Instant::now();
        let mut report = WorkflowReport {
            session_key: ctx.session_key().clone(),
            waves: 0,
            visited: 0,
            skipped: 0,
            discovered: 0,
            stop_reason: None,
            state: WorkflowState::Querying,
        };

        tracing::info!("Starting crawl of {}", ctx.session_key());

        while !report.state.is_terminal() {
            let state = std::mem::replace(&mut report.state, WorkflowState::Querying);
            report.state = match state {
                WorkflowState::Querying => match self.query_step(&ctx.query_input()) {
                    Ok(None) => {
                        report.stop_reason = Some(StopReason::FrontierExhausted);
                        WorkflowState::Done
                    }
                    Ok(Some(_)) if report.waves >= self.config.max_waves => {
                        report.stop_reason = Some(StopReason::WaveBudget);
                        WorkflowState::Done
                    }
                    Ok(Some(_))
                        if self
                            .config
                            .max_duration
                            .is_some_and(|limit| started.elapsed() >= limit) =>
                    {
                        report.stop_reason = Some(StopReason::TimeBudget);
                        WorkflowState::Done
                    }
                    Ok(Some(batch)) => WorkflowState::Extracting(batch),
                    Err(e) => WorkflowState::Failed(e.to_string()),
                },
                WorkflowState::Extracting(batch) => {
                    report.waves += 1;
                    match self.extract_step(&ctx, report.waves, batch).await {
                        Ok(result) => WorkflowState::Updating(result),
                        Err(e) => WorkflowState::Failed(e.to_string()),
                    }
                }
                WorkflowState::Updating(result) => match self.update_step(&ctx, result) {
                    Ok(result) => {
                        report.visited += (result.visited.len() + result.skipped.len()) as u64;
                        report.skipped += result.skipped.len() as u64;
                        report.discovered += result.discovered.len() as u64;
                        tracing::info!(
                            "{} wave {}: {} visited, {} skipped, {} discovered",
                            ctx.session_key(),
                            result.wave,
                            result.visited.len(),
                            result.skipped.len(),
                            result.discovered.len()
                        );
                        WorkflowState::Querying
                    }
                    Err(e) => WorkflowState::Failed(e.to_string()),
                },
                terminal => terminal,
            };
        }

        match &report.state {
            WorkflowState::Failed(error) => {
                tracing::error!(
                    "Crawl of {} failed after {} waves: {}",
                    ctx.session_key(),
                    report.waves,
                    error
                );
            }
            _ => {
                tracing::info!(
                    "Crawl of {} finished after {} waves ({} visited, {} skipped)",
                    ctx.session_key(),
                    report.waves,
                    report.visited,
                    report.skipped
                );
            }
        }

        report
    }
}
