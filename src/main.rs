use anyhow::{Context, Result};
use tello_driver::{Direction, Tello, TelloConfig, TelloEvent};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = TelloConfig::from_env().context("Invalid TELLO_* configuration")?;

    info!("Tello demo starting");
    info!("  Drone: {}", config.peer);
    info!(
        "  Local ports: command={} state={}",
        config.command_port, config.state_port
    );

    let mut tello = Tello::new(config)
        .await
        .context("Failed to bind Tello endpoints")?;

    // Spawn event handler
    let events = tello.subscribe_events();
    tokio::spawn(async move {
        handle_events(events).await;
    });

    if !tello.connect().await? {
        error!("Drone did not enter SDK mode");
        tello.end().await?;
        return Ok(());
    }

    match tello.query_battery().await {
        Ok(percent) => info!("Battery: {}%", percent),
        Err(e) => warn!("Battery query failed: {}", e),
    }

    tello.takeoff().await?;
    tello.move_by(Direction::Forward, 50).await?;
    tello.rotate_clockwise(90).await?;
    tello.move_by(Direction::Back, 50).await?;
    tello.rotate_counter_clockwise(90).await?;

    if let Some(state) = tello.state_text() {
        info!("Last state: {}", state);
    }

    tello.land().await?;
    tello.end().await?;

    Ok(())
}

/// Log events published by the client
async fn handle_events(mut events: broadcast::Receiver<TelloEvent>) {
    loop {
        match events.recv().await {
            Ok(TelloEvent::CommandSent { command }) => {
                debug!("[EVENT] Sent: {}", command);
            }
            Ok(TelloEvent::ResponseReceived { command, response }) => {
                debug!("[EVENT] {} -> {}", command, response);
            }
            Ok(TelloEvent::Timeout { command, timeout }) => {
                warn!("[EVENT] No reply to '{}' within {:?}", command, timeout);
            }
            Ok(TelloEvent::CommandFailed {
                command, attempts, ..
            }) => {
                error!("[EVENT] '{}' failed after {} attempts", command, attempts);
            }
            Ok(TelloEvent::ListenerStopped { listener, reason }) => {
                error!("[EVENT] {} listener stopped: {}", listener, reason);
            }
            Ok(TelloEvent::StreamStarted { address }) => {
                info!("[EVENT] Video streaming from {}", address);
            }
            Ok(TelloEvent::StreamStopped) => {
                info!("[EVENT] Video stopped");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("[EVENT] Dropped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
