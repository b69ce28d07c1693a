//! Telemetry broadcaster for the simulated drone

use crate::responder::DroneModel;
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::warn;

/// Format a state line the way the drone does
pub fn state_line(model: &DroneModel) -> String {
    let height = if model.flying { 80 } else { 0 };
    format!(
        "pitch:0;roll:0;yaw:0;vgx:0;vgy:0;vgz:0;templ:60;temph:63;tof:{};h:{};bat:{};baro:{:.2};time:{};agx:0.00;agy:0.00;agz:-1000.00;\r\n",
        height + 10,
        height,
        model.battery,
        height as f32 / 100.0,
        model.flight_time,
    )
}

/// Send a state line to `target` every `period`
pub async fn run(
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    period: Duration,
    model: Arc<Mutex<DroneModel>>,
) -> Result<()> {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = interval(period);
    let mut ticks: u64 = 0;
    let ticks_per_second = (1000 / period.as_millis()).max(1) as u64;

    loop {
        ticker.tick().await;
        ticks += 1;

        let line = {
            let mut model = model.lock().await;
            if model.flying && ticks % ticks_per_second == 0 {
                model.flight_time += 1;
                // Roughly one percent every ten seconds aloft
                if model.flight_time % 10 == 0 {
                    model.battery = model.battery.saturating_sub(1);
                }
            }
            state_line(&model)
        };

        if let Err(e) = socket.send_to(line.as_bytes(), target).await {
            warn!("[SIM] Failed to send state to {}: {}", target, e);
        }
    }
}
