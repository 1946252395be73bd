//! ==============================================================================
//! main.rs - cwarn host entry point
//! ==============================================================================
//!
//! purpose:
//!     wires the process together for one of two roles:
//!
//!     hub:    mqtt subscription -> ingestor -> snapshot cell <- web server
//!     sensor: simulated node publishing readings on the same topic
//!
//! architecture (hub):
//!
//!     ┌────────────────────────────────────────────────────────────┐
//!     │                       rust host (this file)                 │
//!     │  ┌──────────────────┐                ┌──────────────────┐   │
//!     │  │ mqtt event loop  │                │ web server       │   │
//!     │  │ (ingest task)    │                │ (port 5000)      │   │
//!     │  └────────┬─────────┘                └────────┬─────────┘   │
//!     │           │ replace()                 read()  │             │
//!     │           └──────────► SnapshotCell ◄─────────┘             │
//!     │                 (Arc, created once here)                    │
//!     └────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cwarn_host::api;
use cwarn_host::config::{ConfigOrigin, HostConfig, Role};
use cwarn_host::ingest::{Ingestor, Transport};
use cwarn_host::mqtt::MqttTransport;
use cwarn_host::simulator;
use cwarn_host::state::SnapshotCell;

#[derive(Parser, Debug)]
#[command(name = "cwarn-host")]
#[command(about = "Cloudburst early-warning hub and sensor simulator")]
struct Args {
    /// Role to run, overriding the config file
    #[arg(value_enum)]
    role: Option<Role>,

    /// Path to host.toml (default: config/host.toml, then ../config/host.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // step 1: load configuration (before logging, the level lives in it)
    let (mut config, origin) = match &args.config {
        Some(path) => {
            let config = HostConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            (config, ConfigOrigin::File(path.clone()))
        }
        None => HostConfig::load_or_default(),
    };
    if let Some(role) = args.role {
        config.role = role;
    }

    // step 2: logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid logging.level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match origin {
        ConfigOrigin::File(path) => info!(path = %path.display(), "config loaded"),
        ConfigOrigin::Defaults { skipped } => {
            for (path, reason) in skipped {
                warn!(path = %path.display(), %reason, "ignoring config file");
            }
            warn!("no config file found - using defaults");
        }
    }
    config.log_summary();

    // step 3: run the selected role until it ends or ctrl-c
    let work = async {
        match config.role {
            Role::Hub => run_hub(&config).await,
            Role::Sensor => {
                simulator::run(&config.mqtt, &config.simulator).await;
                Ok(())
            }
        }
    };

    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

async fn run_hub(config: &HostConfig) -> Result<()> {
    // the one shared cell, handed to both sides
    let cell = Arc::new(SnapshotCell::new());

    let ingestor = Ingestor::new(cell.clone()).show_sensor_data(config.logging.show_sensor_data);
    let transport = MqttTransport::new(&config.mqtt);
    let topic = config.mqtt.topic.clone();
    let ingest_task = tokio::spawn(async move {
        if let Err(e) = transport.subscribe(&topic, Arc::new(ingestor)).await {
            error!(error = %e, "mqtt ingest stopped");
        }
    });

    let result = api::serve(config.server.listen_addr, cell)
        .await
        .context("web server failed");
    ingest_task.abort();
    result
}
