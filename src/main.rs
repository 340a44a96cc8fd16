mod command;
mod config;
mod poll;
mod radio;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use command::LedState;
use config::AppConfig;
use poll::{CycleSettings, Dispatch, PollState};
use server::HttpServerClient;
use std::path::PathBuf;
use std::time::Duration;
use tokenrelay_shared::{Address16, TxOutcome};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Relays two-factor tokens from the token server to a remote XBee device
#[derive(Parser, Debug)]
#[command(name = "base-station", version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the server and forward fresh tokens (default)
    Run,
    /// Switch the remote device's LED and exit
    Led {
        #[arg(value_enum, default_value_t = LedState::On)]
        state: LedState,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    info!("Base station starting");
    info!("  Radio: {} at {} baud", config.radio.port, config.radio.baud_rate);
    info!("  Server: {}", config.server.base_url);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_relay(&config).await,
        Command::Led { state } => run_led(&config, state).await,
    }
}

async fn run_relay(config: &AppConfig) -> Result<()> {
    let server = HttpServerClient::new(&config.server)?;
    info!("  Polling {} every {}ms", server.poll_url(), config.poll.interval_ms);
    if config.relay.enabled {
        info!("  Relaying received packets to {}", server.submit_url());
    }

    let mut radio = radio::open(&config.radio.port, config.radio.baud_rate)?;

    let settings = CycleSettings::from(config);
    let mut state = PollState::starting_now();
    poll::run(
        &server,
        &mut radio,
        &settings,
        Duration::from_millis(config.poll.interval_ms),
        &mut state,
        shutdown_signal(),
    )
    .await;

    info!("[POLL] Delivery: {}", state.counters);
    info!(
        "[RELAY] received={} relayed={} errors={}",
        state.relay.received, state.relay.relayed, state.relay.errors
    );

    drop(radio);
    info!("[RADIO] Port closed");
    Ok(())
}

async fn run_led(config: &AppConfig, state: LedState) -> Result<()> {
    let mut radio = radio::open(&config.radio.port, config.radio.baud_rate)?;

    let dispatch = command::run_led(
        &mut radio,
        state,
        Address16(config.radio.destination),
        Duration::from_millis(config.radio.send_timeout_ms),
    )
    .await;

    drop(radio);
    info!("[RADIO] Port closed");

    match dispatch {
        Dispatch::Sent(TxOutcome::Success) => Ok(()),
        other => {
            warn!("[RADIO] LED command not confirmed: {:?}", other);
            Err(anyhow::anyhow!("LED {} was not acknowledged", state))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
