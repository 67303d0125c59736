//! wxalert CLI
//!
//! Command-line interface for the weather alert monitor.

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wxalert::alerting::TriggerCatalog;
use wxalert::api::HttpServer;
use wxalert::config::LoggingConfig;
use wxalert::db::WeatherStore;
use wxalert::monitor::{Monitor, PassReport};
use wxalert::Config;

/// wxalert - Severe weather alerts for Arizona cities
#[derive(Parser)]
#[command(name = "wxalert")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "WXALERT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scheduled monitoring with the HTTP API
    Serve {
        /// HTTP API port
        #[arg(long, env = "WXALERT_HTTP_PORT")]
        http_port: Option<u16>,
    },

    /// Run a single monitoring pass
    Once,

    /// Show recent readings and alerts
    History {
        /// Time range (e.g., "1h", "24h", "7d")
        #[arg(long, default_value = "24h")]
        last: String,

        /// City filter
        #[arg(long)]
        city: Option<String>,
    },

    /// Show the configured alert triggers
    Rules,

    /// Show the effective configuration, credentials masked
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_tracing(&config.logging, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve { http_port } => run_serve(config, http_port).await,
        Commands::Once => run_once(config, cli.format).await,
        Commands::History { last, city } => run_history(config, &last, city, cli.format).await,
        Commands::Rules => run_rules(&config, cli.format),
        Commands::Config => run_config(&config, cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Console logs go to stderr so `--format json` output stays parseable
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json = logging.format == "json";
    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let console_pretty = (!json).then(|| fmt::layer().with_writer(std::io::stderr));

    let (file_layer, guard) = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("invalid log file path: {file}"))?;

            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_pretty)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

fn install_metrics_exporter(config: &Config) -> anyhow::Result<()> {
    if !config.metrics.enabled {
        return Ok(());
    }

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics.port))
        .install()
        .context("failed to install Prometheus exporter")?;

    info!(port = config.metrics.port, "Prometheus exporter listening");
    Ok(())
}

async fn run_serve(mut config: Config, http_port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = http_port {
        config.server.http_port = port;
    }
    install_metrics_exporter(&config)?;

    let monitor = Arc::new(Monitor::from_config(&config).await?);
    let period = config.monitor.poll_interval;
    let run_on_startup = config.monitor.run_on_startup;
    let addr = format!("{}:{}", config.server.host, config.server.http_port);

    info!(
        locations = monitor.locations().len(),
        durable_store = monitor.store().is_durable(),
        "Starting wxalert on http://{}",
        addr
    );

    let scheduler = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move {
            if !run_on_startup {
                tokio::time::sleep(period).await;
            }
            monitor.run_scheduled(period).await;
        })
    };

    let server = HttpServer::new(monitor);

    tokio::select! {
        result = server.serve(&addr) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    scheduler.abort();
    Ok(())
}

async fn run_once(config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let monitor = Monitor::from_config(&config).await?;
    let report = monitor.run_pass().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.summary())?),
        OutputFormat::Text => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &PassReport) {
    println!(
        "{} {}",
        style("Weather check").bold(),
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for reading in &report.readings {
        println!("  {}", reading.summary());
    }
    println!();

    if report.alerts.is_empty() {
        println!("{}", style("No alerts triggered").green());
        return;
    }

    println!("{}", style(format!("{} alert(s) triggered", report.alerts.len())).red().bold());
    for alert in &report.alerts {
        println!("  [{}] {}", style(alert.severity).yellow(), alert.message);
    }
}

async fn run_history(
    config: Config,
    last: &str,
    city: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let window: Duration =
        humantime::parse_duration(last).with_context(|| format!("invalid time range: {last}"))?;

    let store = WeatherStore::connect(&config.database).await;
    if !store.is_durable() {
        eprintln!(
            "{} no database available, only records from this process are shown",
            style("warning:").yellow()
        );
    }

    let readings = store.query_recent_readings(city.as_deref(), window).await;
    let alerts = store.query_recent_alerts(city.as_deref(), window).await;

    if format == OutputFormat::Json {
        let body = serde_json::json!({
            "recent_weather_count": readings.len(),
            "recent_alerts_count": alerts.len(),
            "recent_weather": readings,
            "recent_alerts": alerts,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{} (last {})", style("Readings").bold(), last);
    if readings.is_empty() {
        println!("  none");
    }
    for stored in &readings {
        println!(
            "  {}  {}",
            stored.stored_at.format("%Y-%m-%d %H:%M"),
            stored.reading.summary()
        );
    }

    println!();
    println!("{} (last {})", style("Alerts").bold(), last);
    if alerts.is_empty() {
        println!("  none");
    }
    for stored in &alerts {
        println!(
            "  {}  [{}] {}",
            stored.stored_at.format("%Y-%m-%d %H:%M"),
            stored.alert.severity,
            stored.alert.message
        );
    }

    Ok(())
}

fn run_rules(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let catalog = TriggerCatalog::from_config(&config.triggers);

    if format == OutputFormat::Json {
        let triggers: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&triggers)?);
        return Ok(());
    }

    println!("{:<22} {:<9} {}", "TRIGGER", "SEVERITY", "DESCRIPTION");
    for trigger in catalog.iter() {
        println!(
            "{:<22} {:<9} {}",
            trigger.kind().as_str(),
            trigger.severity.as_str(),
            trigger.description
        );
    }
    println!();
    println!(
        "Local time offset: UTC{:+}",
        config.monitor.utc_offset_hours
    );

    Ok(())
}

fn run_config(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let redacted = config.redacted();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
        OutputFormat::Text => println!("{redacted:#?}"),
    }

    Ok(())
}
