//! Wavecrawl main entry point
//!
//! This is the command-line interface for the Wavecrawl crawl pipeline.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use wavecrawl::config::{resolve_config, Config};
use wavecrawl::gate::http::serve;
use wavecrawl::output::{load_statistics, print_sessions, print_statistics};
use wavecrawl::pipeline::Pipeline;
use wavecrawl::queue::{encode, CrawlTask};
use wavecrawl::{Database, SessionKey};

/// Wavecrawl: a breadth-first crawl pipeline
///
/// Seed URLs are accepted through an ingestion endpoint, given a dedicated
/// frontier, and crawled wave by wave until no unvisited links remain.
#[derive(Parser, Debug)]
#[command(name = "wavecrawl")]
#[command(version)]
#[command(about = "A breadth-first crawl pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (CRAWLER_* environment variables override it)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline and accept crawl requests on POST /kickoff
    Serve,

    /// Crawl one seed URL and wait for its session to finish
    Crawl {
        /// Seed URL
        url: String,

        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 3600)]
        timeout_secs: u64,
    },

    /// List crawl sessions, newest first
    Sessions,

    /// Show frontier statistics for one session
    Stats {
        /// Session key, e.g. crawler_table_example_com_1700000000
        session: String,
    },

    /// Validate the configuration and print it without crawling
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = resolve_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    match (&cli.config, &config_hash) {
        (Some(path), Some(hash)) => {
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash)
        }
        _ => tracing::info!("Configuration resolved from defaults and environment"),
    }

    match cli.command {
        Command::Serve => handle_serve(&config).await,
        Command::Crawl { url, timeout_secs } => {
            handle_crawl(&config, &url, Duration::from_secs(timeout_secs)).await
        }
        Command::Sessions => handle_sessions(&config),
        Command::Stats { session } => handle_stats(&config, &session),
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wavecrawl=info,warn"),
            1 => EnvFilter::new("wavecrawl=debug,tower_http=debug,info"),
            2 => EnvFilter::new("wavecrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(config: &Config) -> Result<Database> {
    let path = Path::new(&config.storage.database_path);
    Database::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Runs the pipeline behind the HTTP ingestion endpoint until Ctrl-C
async fn handle_serve(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let pipeline = Pipeline::start(config, db)?;

    let listener = TcpListener::bind(&config.http.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.http.listen_addr))?;

    serve(listener, pipeline.gate(), async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    let dead_letters = pipeline.dead_letters();
    if !dead_letters.is_empty() {
        tracing::warn!("{} messages were dead-lettered", dead_letters.len());
    }
    pipeline.shutdown().await;
    Ok(())
}

/// Submits one seed through the gate and waits for the crawl to finish
async fn handle_crawl(config: &Config, url: &str, timeout: Duration) -> Result<()> {
    let db = open_database(config)?;
    let pipeline = Pipeline::start(config, db)?;

    let body = encode(&CrawlTask {
        url: url.to_string(),
    })?;
    let submitted_at = Utc::now();
    let response = pipeline.gate().handle(&body).await;
    if response.status != 200 {
        bail!("Crawl request rejected ({}): {}", response.status, response.body);
    }

    let session = tokio::select! {
        result = pipeline.wait_for_session(url, submitted_at, timeout) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, the session will stay unfinished");
            None
        }
    };

    let outcome = match session {
        Some(session) => {
            let stats = load_statistics(pipeline.database(), &session.session_key)?;
            print_statistics(&stats);
            Ok(())
        }
        None => Err(anyhow::anyhow!(
            "Crawl of {} did not finish within {}s",
            url,
            timeout.as_secs()
        )),
    };

    for dead in pipeline.dead_letters() {
        tracing::error!("Dead letter on {}: {} ({})", dead.queue, dead.body, dead.error);
    }
    pipeline.shutdown().await;
    outcome
}

fn handle_sessions(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    print_sessions(&db.list_sessions()?);
    Ok(())
}

fn handle_stats(config: &Config, session: &str) -> Result<()> {
    let key = SessionKey::parse(session)?;
    let db = open_database(config)?;

    println!("Database: {}\n", config.storage.database_path);
    let stats = load_statistics(&db, &key)?;
    print_statistics(&stats);
    Ok(())
}

/// Prints the resolved configuration
fn handle_check(config: &Config) {
    println!("=== Wavecrawl Configuration ===\n");

    println!("Queues:");
    println!("  Crawl tasks: {}", config.queues.crawl_tasks);
    println!("  Executions: {}", config.queues.executions);
    println!("  Max receive count: {}", config.queues.max_receive_count);

    println!("\nWorkflow ({}):", config.workflow.definition);
    println!("  Batch limit: {}", config.workflow.batch_limit);
    println!("  Max concurrency: {}", config.workflow.max_concurrency);
    println!("  Max waves: {}", config.workflow.max_waves);
    match config.workflow.max_duration_secs {
        Some(secs) => println!("  Max duration: {}s", secs),
        None => println!("  Max duration: unlimited"),
    }
    println!(
        "  Fetch retries: {} ({}ms apart)",
        config.workflow.fetch_retries, config.workflow.retry_delay_ms
    );

    println!("\nProvisioning:");
    println!(
        "  Readiness backoff: {}ms..{}ms, timeout {}ms",
        config.provisioning.min_delay_ms,
        config.provisioning.max_delay_ms,
        config.provisioning.timeout_ms
    );
    println!(
        "  Redelivery window: {}s",
        config.provisioning.redelivery_window_secs
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nHTTP:");
    println!("  Listen address: {}", config.http.listen_addr);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");
}
