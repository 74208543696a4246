use crate::config::parser::{ENV_EXECUTIONS_QUEUE, ENV_TASK_QUEUE, ENV_WORKFLOW_DEFINITION};
use crate::config::types::{
    Config, HttpConfig, ProvisioningConfig, QueueConfig, StorageConfig, UserAgentConfig,
    WorkflowSettings,
};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_queue_config(&config.queues)?;
    validate_workflow_config(&config.workflow)?;
    validate_provisioning_config(&config.provisioning)?;
    validate_storage_config(&config.storage)?;
    validate_http_config(&config.http)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.crawl_tasks.trim().is_empty() {
        return Err(ConfigError::Missing {
            key: "queues.crawl-tasks",
            env: ENV_TASK_QUEUE,
        });
    }

    if config.executions.trim().is_empty() {
        return Err(ConfigError::Missing {
            key: "queues.executions",
            env: ENV_EXECUTIONS_QUEUE,
        });
    }

    if config.crawl_tasks == config.executions {
        return Err(ConfigError::Validation(format!(
            "crawl-tasks and executions must be different queues, both are '{}'",
            config.crawl_tasks
        )));
    }

    if config.max_receive_count < 1 {
        return Err(ConfigError::Validation(
            "max-receive-count must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_workflow_config(config: &WorkflowSettings) -> Result<(), ConfigError> {
    if config.definition.trim().is_empty() {
        return Err(ConfigError::Missing {
            key: "workflow.definition",
            env: ENV_WORKFLOW_DEFINITION,
        });
    }

    if config.batch_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-limit must be >= 1, got {}",
            config.batch_limit
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_waves < 1 {
        return Err(ConfigError::Validation(format!(
            "max-waves must be >= 1, got {}",
            config.max_waves
        )));
    }

    if config.max_duration_secs == Some(0) {
        return Err(ConfigError::Validation(
            "max-duration-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_provisioning_config(config: &ProvisioningConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms < 1 {
        return Err(ConfigError::Validation(
            "min-delay-ms must be >= 1".to_string(),
        ));
    }

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) cannot exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.timeout_ms < config.min_delay_ms {
        return Err(ConfigError::Validation(format!(
            "timeout-ms ({}) must be at least min-delay-ms ({})",
            config.timeout_ms, config.min_delay_ms
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    config.listen_addr.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "listen-addr '{}' is not a socket address: {}",
            config.listen_addr, e
        ))
    })?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    // Must contain exactly one @ with text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
