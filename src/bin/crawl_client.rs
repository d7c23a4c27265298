//! Crawl client entry point
//!
//! Submits a URL to the crawl service, waits for the result, prints it as
//! JSON and saves the markdown to disk.

use clap::Parser;
use crawl_relay::client::{ClientConfig, ClientError, CrawlClient, Mode, DEFAULT_PORT, TOKEN_ENV_VAR};
use crawl_relay::RelayError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Upper bound for the wait and interval flags: one day
const MAX_SECONDS: u64 = 86_400;

/// Call the crawl service for a URL
#[derive(Parser, Debug)]
#[command(name = "crawl-client")]
#[command(version)]
#[command(about = "Call the crawl service for a URL", long_about = None)]
struct Cli {
    /// The URL to crawl
    url: String,

    /// Hostname of the crawl service
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port number of the crawl service
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Which crawl endpoint to use
    #[arg(long, value_enum, default_value_t = Mode::Sync)]
    mode: Mode,

    /// Return right after submission instead of polling the task
    #[arg(long)]
    no_wait: bool,

    /// Where to write the extracted markdown
    #[arg(short, long, default_value = "crawl_result.md")]
    output: PathBuf,

    /// Maximum seconds to wait for an async task (1 to 86400)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=MAX_SECONDS))]
    max_wait: u64,

    /// Seconds between task status checks (1 to 86400)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..=MAX_SECONDS))]
    poll_interval: u64,

    /// Request priority
    #[arg(long, default_value_t = 10)]
    priority: i64,

    /// Skip the /health pre-flight check
    #[arg(long)]
    skip_health_check: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit 1 like every other failure
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if matches!(e, RelayError::Client(ClientError::Connect { .. })) {
                eprintln!("Make sure the service is running and the host/port are correct");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> crawl_relay::Result<()> {
    let token = std::env::var(TOKEN_ENV_VAR).ok();

    let mut config = ClientConfig::new(cli.host, cli.port, token)?;
    config.mode = cli.mode;
    config.wait = !cli.no_wait;
    config.output_path = cli.output;
    config.max_wait = Duration::from_secs(cli.max_wait);
    config.poll_interval = Duration::from_secs(cli.poll_interval);
    config.priority = cli.priority;
    config.health_check = !cli.skip_health_check;

    let client = CrawlClient::new(config)?;
    let outcome = client.run(&cli.url).await?;

    match serde_json::to_string_pretty(&outcome.response) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", outcome.response),
    }

    if let Some(path) = outcome.output_path {
        if !cli.quiet {
            eprintln!("Markdown saved to {}", path.display());
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("crawl_relay=info,warn"),
            2 => EnvFilter::new("crawl_relay=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
