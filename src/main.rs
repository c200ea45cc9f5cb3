//! CLI entry point for `mailpost`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};

use mailpost::config::{self, Config};
use mailpost::pipeline::{self, BatchReport};
use mailpost::publish::collect::HttpFetcher;

#[derive(Parser)]
#[command(name = "mailpost", version, about = "Publish blog posts sent by email")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (defaults to $MAILPOST_CONFIG or the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the batch report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process the configured inbox once (default)
    Run,
    /// Process the inbox repeatedly
    Watch {
        /// Polling interval such as 30s, 5m or 1h30m
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Process the given .eml/MBOX files or directories once
    Process {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        _ => {}
    }

    let config = config::load_config(cli.config.as_deref())?;

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let fetcher = HttpFetcher::new(Duration::from_secs(config.source.fetch_timeout_secs))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let report = pipeline::process_inbox(&config, &fetcher)?;
            print_report(&report, cli.json)
        }
        Commands::Watch { interval } => cmd_watch(&config, &fetcher, interval.as_deref(), cli.json),
        Commands::Process { paths } => {
            let report = pipeline::process_paths(&paths, &config, &fetcher)?;
            print_report(&report, cli.json)
        }
        Commands::Completions { .. } | Commands::Manpage => Ok(()),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailpost.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailpost", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Poll the inbox until interrupted.
///
/// A failed batch is logged and retried on the next tick.
fn cmd_watch(
    config: &Config,
    fetcher: &HttpFetcher,
    interval: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let interval = config::parse_interval(interval.unwrap_or(&config.general.interval))?;
    tracing::info!(
        inbox = %config.source.inbox.display(),
        interval_secs = interval.as_secs(),
        "Watching inbox"
    );
    if config.source.rereads_inbox() {
        tracing::warn!(
            "archive_processed is off: every pass republishes all inbox messages \
             and fetches their remote images again"
        );
    }

    loop {
        let start = Instant::now();
        match pipeline::process_inbox(config, fetcher) {
            Ok(report) if report.messages > 0 => print_report(&report, json)?,
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Batch failed"),
        }
        std::thread::sleep(interval.saturating_sub(start.elapsed()));
    }
}

fn print_report(report: &BatchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", "Messages", report.messages);
    if report.skipped > 0 {
        println!("  {:<20} {}", "Skipped (sender)", report.skipped);
    }
    println!("  {:<20} {}", "Posts written", report.posts_written.len());
    for path in &report.posts_written {
        println!("    {}", path.display());
    }
    println!("  {:<20} {}", "Images saved", report.images_saved.len());
    for path in &report.images_saved {
        println!("    {}", path.display());
    }
    if !report.diagnostics.is_empty() {
        println!("  {:<20} {}", "Problems", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("    {}: {}", diagnostic.subject, diagnostic.reason);
        }
    }
    println!();
    Ok(())
}
