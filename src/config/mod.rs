//! Configuration module for Wavecrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and layering the `CRAWLER_*` environment overrides on top.
//!
//! # Example
//!
//! ```no_run
//! use wavecrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wavecrawl.toml")).unwrap();
//! println!("Crawl tasks arrive on: {}", config.queues.crawl_tasks);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpConfig, ProvisioningConfig, QueueConfig, StorageConfig, UserAgentConfig,
    WorkflowSettings,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, resolve_config,
    ENV_DATABASE_PATH, ENV_EXECUTIONS_QUEUE, ENV_TASK_QUEUE, ENV_WORKFLOW_DEFINITION,
};

pub use validation::validate;
