use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use greenhouse_core::config::{DEFAULT_CONTROLLER, DEFAULT_HISTORY};
use greenhouse_core::{Catalog, ControllerTransport, DashboardSnapshot, HttpTransport, MonitorConfig, NodeKeyPolicy, Poller};
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(test)]
mod main_tests;
mod viewer;
#[cfg(test)]
mod viewer_tests;

#[derive(Debug, Parser)]
#[command(name = "greenhoused")]
#[command(about = "Greenhouse controller monitor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Controller address, bare IP or URL
    #[arg(long, default_value = DEFAULT_CONTROLLER)]
    controller: String,

    #[arg(long, default_value_t = 5000)]
    interval_ms: u64,

    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[arg(long, default_value_t = DEFAULT_HISTORY)]
    history: usize,

    /// Only accept node keys listed in the catalog
    #[arg(long)]
    strict_nodes: bool,

    #[arg(long, default_value = "node")]
    node_prefix: String,

    /// JSON catalog replacing the built-in greenhouse layout
    #[arg(long)]
    catalog: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Probe,
    Once {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    /// Alarm flag and per-node reachability
    Status {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    ResetAlarm,
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    View,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_json_file(path)?,
        None => Catalog::greenhouse(),
    };
    let node_keys = if cli.strict_nodes {
        NodeKeyPolicy::Strict
    } else {
        NodeKeyPolicy::Prefix(cli.node_prefix.clone())
    };

    let config = MonitorConfig {
        controller: cli.controller.clone(),
        request_timeout: Duration::from_millis(cli.timeout_ms),
        history: cli.history,
        node_keys,
        ..MonitorConfig::default()
    }
    .with_data_interval(Duration::from_millis(cli.interval_ms));

    let transport = HttpTransport::new(&config.controller, config.request_timeout);
    let mut poller = Poller::new(transport, Arc::new(catalog), config);

    match cli.command {
        Command::Probe => {
            let out = match poller.probe().await {
                Ok(report) => serde_json::json!({
                    "controller": poller.controller(),
                    "reachable": true,
                    "report": report,
                }),
                Err(err) => serde_json::json!({
                    "controller": poller.controller(),
                    "reachable": false,
                    "error": err.to_string(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Once { format } => {
            poller.refresh_now().await;
            print_dashboard(&poller.dashboard().await, format)?;
        }
        Command::Status { format } => {
            poller.refresh_status().await;
            let dashboard = poller.dashboard().await;
            if dashboard.quality.status_err > 0 {
                warn!(controller = %dashboard.controller, "status endpoint unreachable");
            }
            print_status(&dashboard, format)?;
        }
        Command::ResetAlarm => {
            poller.reset_alarm().await?;
            let dashboard = poller.dashboard().await;
            println!(
                "alarm reset accepted by {}; alarm now {}",
                dashboard.controller,
                if dashboard.alarm { "still active" } else { "clear" }
            );
        }
        Command::Watch { format } => {
            poller.start();
            stream_loop(&poller, format).await?;
            poller.stop();
        }
        Command::View => {
            viewer::run_viewer(&mut poller).await?;
        }
    }

    Ok(())
}

async fn stream_loop<T: ControllerTransport>(poller: &Poller<T>, format: OutputFormat) -> Result<()> {
    let period = poller.config().data_interval.max(Duration::from_millis(1));
    let start = Instant::now() + Duration::from_millis(250);
    let mut ticker = interval_at(start, period);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            _ = ticker.tick() => {
                let dashboard = poller.dashboard().await;
                print_dashboard(&dashboard, format)?;
                info!(connected=%dashboard.connected, alarm=%dashboard.alarm, "tick");
            }
        }
    }

    Ok(())
}

fn print_dashboard(dashboard: &DashboardSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(dashboard)?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(dashboard)?);
        }
        OutputFormat::Human => {
            println!("=== Greenhouse Snapshot ===");
            println!("Time:       {}", dashboard.ts.to_rfc3339());
            println!("Controller: {}", dashboard.controller);
            println!(
                "State:      connected={} alarm={} last_update={}",
                dashboard.connected,
                dashboard.alarm,
                dashboard
                    .last_update
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string()),
            );
            println!(
                "Polls:      data ok={} err={}  status ok={} err={}",
                dashboard.quality.data_ok,
                dashboard.quality.data_err,
                dashboard.quality.status_ok,
                dashboard.quality.status_err,
            );

            if dashboard.alarm {
                println!("!!! ALARM ACTIVE (run `greenhoused reset-alarm`) !!!");
            }

            for node in &dashboard.nodes {
                println!(
                    "[{}] {} ({}){}",
                    if node.reachable { "up" } else { "--" },
                    node.name,
                    node.id,
                    node.category
                        .as_deref()
                        .map(|c| format!(" {c}"))
                        .unwrap_or_default()
                );
                if node.readings.is_empty() {
                    println!("  no data");
                }
                for (key, value) in &node.readings {
                    println!("  {key:<16} {}", viewer::format_reading(value));
                }
            }
        }
    }

    Ok(())
}

fn status_view(dashboard: &DashboardSnapshot) -> serde_json::Value {
    serde_json::json!({
        "ts": dashboard.ts,
        "controller": dashboard.controller,
        "reachable": dashboard.quality.status_ok > 0,
        "alarm": dashboard.alarm,
        "nodes": dashboard
            .nodes
            .iter()
            .map(|node| serde_json::json!({
                "id": node.id,
                "name": node.name,
                "reachable": node.reachable,
            }))
            .collect::<Vec<_>>(),
    })
}

fn print_status(dashboard: &DashboardSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status_view(dashboard))?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(&status_view(dashboard))?);
        }
        OutputFormat::Human => {
            println!("=== Greenhouse Status ===");
            println!("Controller: {}", dashboard.controller);
            if dashboard.quality.status_ok == 0 {
                println!("Status:     unavailable");
                return Ok(());
            }
            println!("Alarm:      {}", if dashboard.alarm { "ACTIVE" } else { "clear" });
            for node in &dashboard.nodes {
                println!(
                    "[{}] {} ({})",
                    if node.reachable { "up" } else { "--" },
                    node.name,
                    node.id
                );
            }
        }
    }

    Ok(())
}
