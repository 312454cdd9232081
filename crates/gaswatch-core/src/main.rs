//! gaswatch CLI
//!
//! Command-line interface for the gas price checker.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gaswatch::config::LoggingConfig;
use gaswatch::models::{CheckOutcome, CheckReport};
use gaswatch::store::{ObservationLog, StateStore};
use gaswatch::{Config, PriceCheckRunner, Watcher};
use tracing::info;

/// gaswatch - Ethereum gas price alerts
#[derive(Parser)]
#[command(name = "gaswatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "GASWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Defaults to `check`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one check cycle and exit
    Check,

    /// Run check cycles on an interval until interrupted
    Watch {
        /// Interval between checks (e.g. "30s", "5m"); overrides CHECK_INTERVAL
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },

    /// Show recorded observations
    History {
        /// Number of most recent observations to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show or reset the alert state
    State {
        /// Re-arm the alert
        #[arg(long)]
        reset: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();

    // Config warnings go through a temporary stderr subscriber
    let bootstrap = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .finish();
    let loaded = tracing::subscriber::with_default(bootstrap, || {
        Config::load(cli.config.as_deref())
    });

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    // Execute command
    let result = match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => run_check(&config, cli.format).await,
        Commands::Watch { interval } => run_watch(&config, interval).await,
        Commands::History { limit } => run_history(&config, limit, cli.format).await,
        Commands::State { reset } => run_state(&config, reset, cli.format).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &LoggingConfig, verbose: bool) {
    let log_level = if verbose { "debug" } else { config.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_check(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let runner = PriceCheckRunner::from_config(config)?;
    let report = runner.run().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    let outcome = match report.outcome {
        CheckOutcome::Triggered if report.notified => "alert sent",
        CheckOutcome::Triggered => "alert NOT delivered",
        CheckOutcome::Reset => "alert re-armed",
        CheckOutcome::NoAction => "no action",
    };

    println!(
        "{:.2} gwei (threshold {:.2}): {}",
        report.observation.value, report.threshold, outcome
    );
}

async fn run_watch(config: &Config, interval: Option<Duration>) -> anyhow::Result<()> {
    let interval = interval.unwrap_or_else(|| config.alerting.check_interval());
    anyhow::ensure!(!interval.is_zero(), "interval must be positive");

    let runner = PriceCheckRunner::from_config(config)?;
    let stats = Watcher::new(runner, interval)
        .run_until(shutdown_signal())
        .await;

    info!(
        completed = stats.completed,
        failed = stats.failed,
        "Exiting"
    );
    Ok(())
}

async fn run_history(config: &Config, limit: usize, format: OutputFormat) -> anyhow::Result<()> {
    let log = ObservationLog::new(config.storage.observations_path());
    let observations = log.tail(limit).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&observations)?),
        OutputFormat::Text => {
            if observations.is_empty() {
                println!("No observations recorded in {}", log.path().display());
            }
            for obs in &observations {
                println!(
                    "{}  {:>8.2} gwei  {}",
                    obs.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    obs.value,
                    obs.source
                );
            }
        }
    }
    Ok(())
}

async fn run_state(config: &Config, reset: bool, format: OutputFormat) -> anyhow::Result<()> {
    let store = StateStore::new(config.storage.state_path());

    let state = if reset {
        Some(store.save(false).await?)
    } else {
        store.load().await?
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        OutputFormat::Text => print_state(store.path(), state.as_ref()),
    }
    Ok(())
}

fn print_state(path: &Path, state: Option<&gaswatch::models::AlertState>) {
    match state {
        None => println!("No state file at {} (alert armed)", path.display()),
        Some(state) => {
            let status = if state.notified { "notified" } else { "armed" };
            match state.updated_at {
                Some(at) => println!("{status} (since {})", at.to_rfc3339()),
                None => println!("{status}"),
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "gaswatch", &mut io::stdout());
}
