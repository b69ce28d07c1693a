//! Simulated Tello drone
//!
//! Answers SDK commands on a UDP port and broadcasts telemetry, so the driver
//! can be exercised without hardware.

mod config;
mod responder;
mod telemetry;

use config::SimConfig;
use responder::{DroneModel, Responder};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = SimConfig::from_env()?;

    let command_socket = Arc::new(UdpSocket::bind(config.command_addr).await?);
    let state_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await?);

    info!("Simulated drone listening on {}", config.command_addr);
    info!("  Reply policy: {:?}", config.policy);
    info!("  Telemetry -> {} every {:?}", config.state_target, config.state_interval);

    let model = Arc::new(Mutex::new(DroneModel::default()));

    let state_task = tokio::spawn(telemetry::run(
        state_socket,
        config.state_target,
        config.state_interval,
        model.clone(),
    ));

    let responder = Responder::new(config.policy, model);
    let command_task = tokio::spawn(responder::run(
        command_socket,
        responder,
        config.reply_delay,
    ));

    tokio::select! {
        result = command_task => {
            error!("Command loop exited: {:?}", result);
        }
        result = state_task => {
            error!("Telemetry loop exited: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
