// Copyright 2026 turist-scrape contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use turist_scrape::cli;
use turist_scrape::config::{self, ScrapeConfig, Timings};
use turist_scrape::console::Console;
use turist_scrape::pool::Mode;

#[derive(Parser)]
#[command(
    name = "turist-scrape",
    about = "Deep scraper for turistinfo.ro accommodation listings",
    version,
    after_help = "Run 'turist-scrape <command> --help' for details on each command.\nRun 'turist-scrape' with no command to scrape with the default settings."
)]
struct Cli {
    /// Suppress per-URL progress output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every detail page listed in the seed file
    Scrape(ScrapeArgs),
    /// Crawl the listing index and write the seed file
    Seed {
        /// Listing index page
        #[arg(long, default_value = config::LISTING_URL)]
        url: String,
        /// Seed file to write
        #[arg(long, default_value = config::INPUT_FILE)]
        output: PathBuf,
    },
    /// Print a text summary of a scrape output
    Stats {
        /// Scrape output to analyze
        #[arg(long, default_value = config::OUTPUT_FILE)]
        input: PathBuf,
        /// Number of localities to rank
        #[arg(long, default_value_t = 15)]
        top: usize,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Args)]
struct ScrapeArgs {
    /// Seed file listing the detail pages
    #[arg(long, default_value = config::INPUT_FILE)]
    input: PathBuf,
    /// Output file (overwritten)
    #[arg(long, default_value = config::OUTPUT_FILE)]
    output: PathBuf,
    /// Concurrent browser sessions
    #[arg(long, default_value_t = config::MAX_WORKERS)]
    concurrency: usize,
    /// Reuse one browser session for every URL, sequentially
    #[arg(long, conflicts_with = "concurrency")]
    single_session: bool,
    /// Navigation timeout in seconds
    #[arg(long, default_value_t = config::NAVIGATION_TIMEOUT.as_secs())]
    nav_timeout: u64,
    /// Append progress events to this JSONL file
    #[arg(long)]
    run_log: Option<PathBuf>,
    /// Chromium binary to use
    #[arg(long)]
    chromium: Option<PathBuf>,
}

impl From<ScrapeArgs> for ScrapeConfig {
    fn from(args: ScrapeArgs) -> Self {
        let mode = if args.single_session {
            Mode::SingleSession
        } else {
            Mode::Pooled {
                concurrency: args.concurrency,
            }
        };
        Self {
            input: args.input,
            output: args.output,
            mode,
            timings: Timings {
                navigation_timeout: Duration::from_secs(args.nav_timeout),
                ..Timings::default()
            },
            run_log: args.run_log,
            chromium: args.chromium,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let console = Arc::new(Console::stdout(cli.quiet));

    let result = match cli.command {
        // No subcommand → scrape with defaults
        None => cli::scrape_cmd::run(ScrapeConfig::default(), Arc::clone(&console)).await,

        Some(Commands::Scrape(args)) => {
            cli::scrape_cmd::run(args.into(), Arc::clone(&console)).await
        }
        Some(Commands::Seed { url, output }) => cli::seed_cmd::run(&url, &output, &console).await,
        Some(Commands::Stats { input, top }) => cli::stats_cmd::run(&input, top, &console),
        Some(Commands::Doctor) => cli::doctor::run(&console),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "turist-scrape", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
