use serde::Deserialize;

/// Main configuration structure for Wavecrawl
///
/// Every section may be omitted; only the queue identifiers and the workflow
/// definition have no usable default and must come from the file or the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queues: QueueConfig,
    pub workflow: WorkflowSettings,
    pub provisioning: ProvisioningConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Queue identifiers and delivery policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue that receives crawl tasks from the ingestion gate
    #[serde(rename = "crawl-tasks")]
    pub crawl_tasks: String,

    /// Queue that receives execution-start messages from the provisioner
    pub executions: String,

    /// Deliveries before a failing message is dead-lettered
    #[serde(rename = "max-receive-count")]
    pub max_receive_count: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            crawl_tasks: String::new(),
            executions: String::new(),
            max_receive_count: 3,
        }
    }
}

/// Crawl workflow behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Name of the workflow definition executions are started from
    pub definition: String,

    /// Maximum unvisited URLs pulled from the frontier per wave
    #[serde(rename = "batch-limit")]
    pub batch_limit: usize,

    /// Maximum concurrent extractions within a wave
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: usize,

    /// Maximum number of waves before a session is stopped
    #[serde(rename = "max-waves")]
    pub max_waves: u32,

    /// Optional wall-clock limit for a session (seconds)
    #[serde(rename = "max-duration-secs")]
    pub max_duration_secs: Option<u64>,

    /// Extra extraction attempts for a URL before it is skipped
    #[serde(rename = "fetch-retries")]
    pub fetch_retries: u32,

    /// Pause between extraction attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            definition: String::new(),
            batch_limit: 10,
            max_concurrency: 2,
            max_waves: 1000,
            max_duration_secs: None,
            fetch_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Frontier table provisioning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// First delay between readiness checks (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound for the delay between readiness checks (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Total time to wait for a table to become ready (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Window in which a repeated crawl task for the same URL is treated as a redelivery
    #[serde(rename = "redelivery-window-secs")]
    pub redelivery_window_secs: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1_000,
            max_delay_ms: 2_000,
            timeout_ms: 13_000,
            redelivery_window_secs: 300,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./wavecrawl.db".to_string(),
        }
    }
}

/// Ingestion endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "listen-addr")]
    pub listen_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Renders the User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "wavecrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/wavecrawl".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}
