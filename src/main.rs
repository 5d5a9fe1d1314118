mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use goflow_core::config::EngineConfig;
use goflow_core::EventBus;

use demo::Samples;

#[derive(Parser)]
#[command(name = "goflow", version, about = "Composable task flows over a shared context")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "goflow.toml", env = "GOFLOW_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sample flows and print their outcomes
    Demo {
        /// Print each flow report as JSON
        #[arg(long)]
        json: bool,
        /// Print lifecycle events after the flows finish
        #[arg(long)]
        events: bool,
    },
    /// Show current configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Demo {
        json: false,
        events: false,
    }) {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Demo { json, events } => run_demo(&config, json, events)?,
    }

    Ok(())
}

fn run_demo(config: &EngineConfig, json: bool, events: bool) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::new(config.events.capacity));
    let mut rx = bus.subscribe();

    let samples = demo::run_all(&Samples {
        config,
        bus: events.then(|| Arc::clone(&bus)),
    });

    for sample in &samples {
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "name": sample.name,
                    "succeeded": sample.succeeded,
                    "status_code": sample.status_code,
                    "error": sample.error,
                    "report": sample.report,
                }))?
            );
        } else {
            let outcome = match (&sample.error, sample.status_code) {
                (Some(err), _) => format!("failed: {err}"),
                (None, 0) => "ok".to_string(),
                (None, code) => format!("failed: status {code}"),
            };
            println!("{:<24} {}", sample.name, outcome);
        }
    }

    if events {
        let mut count = 0usize;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    count += 1;
                }
                Err(tokio::sync::broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(missed = n, "Event buffer overflowed; raise events.capacity");
                }
                Err(_) => break,
            }
        }
        info!(count, "Events printed");
    }

    let failed = samples.iter().filter(|s| !s.succeeded).count();
    info!(flows = samples.len(), failed, "Demo complete");
    Ok(())
}
