/// Crawl session lifecycle definitions
use std::fmt;

/// Where a crawl session is in its lifecycle
///
/// `Provisioning → Seeded → Queued → Running → Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    // ===== Provisioner States =====
    /// Key reserved, frontier table being created
    Provisioning,

    /// Table ready and seed URL written
    Seeded,

    /// Execution-start message sent
    Queued,

    // ===== Workflow States =====
    /// A workflow execution is expanding the frontier
    Running,

    // ===== Terminal States =====
    /// The workflow reached Done
    Completed,

    /// Provisioning or the workflow failed
    Failed,
}

impl SessionStatus {
    /// Returns true once the session can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true while the provisioner has not finished its work
    ///
    /// A redelivered task for a session in one of these states resumes
    /// provisioning instead of being treated as a duplicate.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Provisioning | Self::Seeded)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Seeded => "seeded",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "provisioning" => Some(Self::Provisioning),
            "seeded" => Some(Self::Seeded),
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible session states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Provisioning,
            Self::Seeded,
            Self::Queued,
            Self::Running,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}

/// Why a workflow stopped expanding the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// No unvisited URLs remained
    FrontierExhausted,

    /// The configured wave budget ran out
    WaveBudget,

    /// The configured wall-clock budget ran out
    TimeBudget,
}

impl StopReason {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::FrontierExhausted => "frontier_exhausted",
            Self::WaveBudget => "wave_budget",
            Self::TimeBudget => "time_budget",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "frontier_exhausted" => Some(Self::FrontierExhausted),
            "wave_budget" => Some(Self::WaveBudget),
            "time_budget" => Some(Self::TimeBudget),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}
