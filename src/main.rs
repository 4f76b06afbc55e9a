//! # og-fetcher CLI Application
//!
//! Command-line front end for the link-preview fetcher.
//!
//! ## Subcommands
//!
//! - `fetch`: fetch one or more URLs and print their outcomes as JSON
//!
//! Every URL yields exactly one line on stdout, in argument order. Fetch
//! errors are part of the output, not a process failure; logs go to stderr
//! or, with `--log-dir`, to a file.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use og_fetcher::{FetcherConfig, FetcherService};
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about = "Fetch link-preview metadata (title, Open Graph tags) for URLs", long_about = None)]
struct Cli {
    /// Write logs to og-fetcher.log in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch metadata for one or more URLs
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// URLs to fetch
    #[arg(required = true)]
    urls: Vec<String>,

    /// Pretty-print each outcome
    #[arg(long)]
    pretty: bool,

    /// Maximum number of body bytes read per page
    #[arg(long, env = "OG_MAX_BODY_SIZE", default_value_t = og_fetcher::fetcher::DEFAULT_MAX_BODY_SIZE)]
    max_body_size: u64,

    /// Maximum number of redirects followed
    #[arg(long, env = "OG_MAX_REDIRECTS", default_value = "1")]
    max_redirects: u32,

    /// Allow URLs with a non-default port
    #[arg(long, env = "OG_HANDLE_NON_STANDARD_PORTS")]
    allow_non_standard_ports: bool,

    /// Timeout per attempt in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Attempts per request on transport failures
    #[arg(long, default_value = "3")]
    attempts: u32,

    /// Maximum number of cached URLs
    #[arg(long, default_value = "1000")]
    cache_capacity: usize,
}

impl FetchArgs {
    fn config(&self) -> FetcherConfig {
        FetcherConfig::builder()
            .max_body_size(self.max_body_size)
            .max_redirects(self.max_redirects)
            .handle_non_standard_ports(self.allow_non_standard_ports)
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_attempts(self.attempts)
            .cache_capacity(self.cache_capacity)
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing_subscriber(cli.log_dir.as_deref())?;

    match cli.command {
        Some(Commands::Fetch(args)) => {
            fetch_command(args).await?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["og-fetcher", "--help"]);
        }
    }

    Ok(())
}

#[instrument(skip_all, fields(urls = args.urls.len()))]
async fn fetch_command(args: FetchArgs) -> anyhow::Result<()> {
    let service = FetcherService::new(args.config())?;

    let outcomes = futures::future::join_all(args.urls.iter().map(|url| service.fetch(url))).await;

    let failed = outcomes.iter().filter(|outcome| outcome.is_error()).count();
    for outcome in &outcomes {
        let line = if args.pretty {
            serde_json::to_string_pretty(&**outcome)?
        } else {
            serde_json::to_string(&**outcome)?
        };
        println!("{line}");
    }

    info!(total = outcomes.len(), failed, "fetch complete");
    Ok(())
}
