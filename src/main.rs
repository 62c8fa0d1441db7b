use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hit_codec::decode_hit;
use hitaudit_cli::{load_config, metrics, run_audit, RunOptions};
use hitaudit_registry::validate;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// hitaudit - audit the analytics hits a website sends
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Visit every configured page and record its analytics hits
    Run(RunArgs),
    /// Decode and validate a single hit URL offline
    Decode(DecodeArgs),
    /// Print the effective schema as YAML
    Schema,
}

#[derive(Args)]
struct RunArgs {
    /// Read the sink header but do not write rows
    #[arg(long)]
    dry_run: bool,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Attach to a running browser instead of launching one
    #[arg(long, value_name = "URL")]
    ws_url: Option<String>,

    /// Write prometheus metrics here when the run ends
    #[arg(long, value_name = "FILE")]
    metrics_out: Option<PathBuf>,
}

#[derive(Args)]
struct DecodeArgs {
    /// A full collection URL, e.g. https://www.google-analytics.com/g/collect?v=2&en=page_view
    url: String,

    /// Replace the allow-list for this check (repeatable)
    #[arg(long = "tracked", value_name = "EVENT")]
    tracked: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug, &cli.log_format)?;
    info!(
        "Starting hitaudit v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_DATE")
    );

    let result = match cli.command {
        Commands::Run(args) => cmd_run(cli.config, args).await,
        Commands::Decode(args) => cmd_decode(cli.config, args).await,
        Commands::Schema => cmd_schema(cli.config).await,
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool, format: &LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    // stdout carries command output
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Human => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}

async fn cmd_run(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let config = load_config(config_path.as_deref()).await?;
    metrics::register_metrics();

    let outcome = run_audit(
        config,
        RunOptions {
            dry_run: args.dry_run,
            headful: args.headful,
            ws_url: args.ws_url,
        },
    )
    .await;

    let snapshot = cdp_adapter::metrics::snapshot();
    info!(
        navigations = snapshot.navigations,
        failed_navigations = snapshot.failed_navigations,
        hit_requests = snapshot.hit_requests,
        hit_responses = snapshot.hit_responses,
        missing_bodies = snapshot.missing_bodies,
        "browser metrics"
    );
    if let Some(path) = &args.metrics_out {
        metrics::write_to(path).await?;
    }

    let summary = outcome?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn cmd_decode(config_path: Option<PathBuf>, args: DecodeArgs) -> Result<()> {
    let config = load_config(config_path.as_deref()).await?;
    let mut registry = config.registry()?;
    if !args.tracked.is_empty() {
        registry = registry.with_tracked_events(args.tracked);
    }

    let hit = decode_hit(&args.url, &registry.field_maps)?;
    let validation = validate(
        &hit.event_details,
        &hit.user_properties,
        &hit.items,
        &registry,
    );
    let tracked = hit
        .event_name()
        .map(|name| registry.is_tracked(name))
        .unwrap_or(false);

    let report = json!({
        "event_name": hit.event_name(),
        "tracked": tracked,
        "user_properties": hit.user_properties,
        "custom_user_properties": hit.custom_user_properties,
        "event_details": hit.event_details,
        "items": hit.items,
        "errors": validation.errors,
        "warnings": validation.warnings,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_schema(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref()).await?;
    print!("{}", config.registry()?.to_yaml()?);
    Ok(())
}
