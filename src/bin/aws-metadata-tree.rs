//! CLI binary for aws-metadata-tree crate.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use aws_metadata_tree::{Crawler, CrawlerConfig, MetadataError};

#[derive(Parser)]
#[command(name = "aws-metadata-tree")]
#[command(
    author,
    version,
    about = "Dump EC2 and ECS metadata as a single JSON tree"
)]
struct Cli {
    /// Per-request timeout in milliseconds
    #[arg(long, global = true, default_value_t = 200)]
    timeout_ms: u64,

    /// Maximum directory nesting to follow
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Maximum response size in bytes to accept
    #[arg(short, long, global = true)]
    max_size: Option<usize>,

    /// Instance metadata base URL, instead of the link-local address
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print compact instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every metadata source
    Snapshot,

    /// Crawl the directory tree below a URL
    Crawl {
        /// Directory URL to start from
        url: String,
    },

    /// Fetch and classify a single URL
    Fetch {
        /// URL of the value
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn config(cli: &Cli) -> CrawlerConfig {
    let mut config =
        CrawlerConfig::from_env().with_timeout(Duration::from_millis(cli.timeout_ms));
    if let Some(base_url) = &cli.base_url {
        config = config.with_instance_base_url(base_url);
    }
    if let Some(max_depth) = cli.max_depth {
        config = config.with_max_depth(max_depth);
    }
    if let Some(max_size) = cli.max_size {
        config = config.with_max_body_size(max_size);
    }
    config
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<(), MetadataError> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), MetadataError> {
    let crawler = Crawler::new(config(&cli))?;

    match &cli.command {
        Commands::Snapshot => {
            let snapshot = crawler.snapshot().await;
            print_json(&snapshot, cli.compact)
        }

        Commands::Crawl { url } => {
            let tree = crawler.crawl(url).await?;
            print_json(&tree, cli.compact)
        }

        Commands::Fetch { url } => {
            let leaf = crawler.fetch_leaf(url).await?;
            print_json(&leaf, cli.compact)
        }
    }
}
