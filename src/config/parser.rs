use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Overrides `[queues] crawl-tasks`
pub const ENV_TASK_QUEUE: &str = "CRAWLER_TASK_QUEUE";
/// Overrides `[queues] executions`
pub const ENV_EXECUTIONS_QUEUE: &str = "CRAWLER_EXECUTIONS_QUEUE";
/// Overrides `[workflow] definition`
pub const ENV_WORKFLOW_DEFINITION: &str = "CRAWLER_WORKFLOW_DEFINITION";
/// Overrides `[storage] database-path`
pub const ENV_DATABASE_PATH: &str = "CRAWLER_DATABASE_PATH";

fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are not applied; see [`resolve_config`].
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = parse_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the configuration they used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Applies `CRAWLER_*` overrides using the given variable lookup
///
/// Empty values are ignored so an exported-but-blank variable does not wipe a
/// value from the file.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(value) = get(ENV_TASK_QUEUE) {
        config.queues.crawl_tasks = value;
    }
    if let Some(value) = get(ENV_EXECUTIONS_QUEUE) {
        config.queues.executions = value;
    }
    if let Some(value) = get(ENV_WORKFLOW_DEFINITION) {
        config.workflow.definition = value;
    }
    if let Some(value) = get(ENV_DATABASE_PATH) {
        config.storage.database_path = value;
    }
}

/// Resolves the runtime configuration once at startup
///
/// Reads the file when one is given (defaults otherwise), layers the process
/// environment on top and validates the result.
///
/// # Returns
///
/// * `Ok((Config, Option<String>))` - The configuration and the file hash, if a file was read
/// * `Err(ConfigError)` - Unreadable file, invalid TOML, or a missing/invalid setting
pub fn resolve_config(path: Option<&Path>) -> Result<(Config, Option<String>), ConfigError> {
    let (mut config, hash) = match path {
        Some(path) => (parse_config(path)?, Some(compute_config_hash(path)?)),
        None => (Config::default(), None),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate(&config)?;

    Ok((config, hash))
}
