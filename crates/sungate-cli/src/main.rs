//! Command-line interface for the SunGate gateway daemon.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, FixedOffset, Offset, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sungate_control::{CommandState, ControlPlane, SolarEphemeris};
use sungate_gateway::{
    router, AggregationRelay, AppState, GatewayConfig, Inboxes, LogSink, MqttPublisher,
};

/// SunGate - gateway for sun-tracking solar panel fleets.
#[derive(Parser, Debug)]
#[command(name = "sungate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the gateway.
    Serve,
    /// Validate the configuration file and print the effective settings.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<GatewayConfig> {
    match path {
        Some(path) => GatewayConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(GatewayConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match args.command {
        Command::Serve => serve(load_config(args.config.as_ref())?).await,
        Command::CheckConfig => {
            let config = load_config(args.config.as_ref())?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn serve(config: GatewayConfig) -> Result<()> {
    info!(version = sungate_gateway::VERSION, "starting sungate gateway");

    let initial = CommandState {
        latitude: config.site.latitude,
        longitude: config.site.longitude,
        local_timezone: FixedOffset::east_opt(config.site.timezone_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix()),
        ..CommandState::default()
    };
    let control = ControlPlane::new(initial, Arc::new(SolarEphemeris));

    let (inboxes, storage_rx, relay_rx) = Inboxes::new(config.relay.queue_capacity);

    // Relay path: windowed aggregation feeding the MQTT publisher.
    let (publisher, _mqtt_driver) = MqttPublisher::connect(&config.mqtt);
    let relay = AggregationRelay::new(
        relay_rx,
        Arc::new(publisher),
        Duration::seconds(config.relay.window_secs as i64),
    );
    tokio::spawn(relay.run());

    // Storage path: the durable collaborator drains its inbox.
    tokio::spawn(sungate_gateway::run_storage_forwarder(
        storage_rx,
        Arc::new(LogSink),
    ));

    let app = router(AppState { control, inboxes });
    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!(addr = %config.server.bind, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
