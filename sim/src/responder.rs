//! Command responder for the simulated drone

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tello_shared::ReadCommand;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How the simulated drone answers control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPolicy {
    /// Always "ok"
    Ok,
    /// Always "error"
    Error,
    /// Never reply
    Silent,
    /// Ignore the first `n` copies of each command, then "ok"
    FailFirst(u32),
}

impl FromStr for ReplyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ok" => Ok(ReplyPolicy::Ok),
            "error" => Ok(ReplyPolicy::Error),
            "silent" => Ok(ReplyPolicy::Silent),
            other => match other.strip_prefix("fail-first:") {
                Some(n) => Ok(ReplyPolicy::FailFirst(n.parse()?)),
                None => Err(anyhow!("Unknown reply policy: {}", s)),
            },
        }
    }
}

/// Simulated flight state driving the read-command answers
#[derive(Debug, Clone)]
pub struct DroneModel {
    pub battery: u8,
    pub speed: u32,
    pub flight_time: u32,
    pub flying: bool,
    pub streaming: bool,
}

impl Default for DroneModel {
    fn default() -> Self {
        Self {
            battery: 87,
            speed: 100,
            flight_time: 0,
            flying: false,
            streaming: false,
        }
    }
}

/// Decides the reply for each received command
pub struct Responder {
    policy: ReplyPolicy,
    model: Arc<Mutex<DroneModel>>,
    seen: HashMap<String, u32>,
}

impl Responder {
    pub fn new(policy: ReplyPolicy, model: Arc<Mutex<DroneModel>>) -> Self {
        Self {
            policy,
            model,
            seen: HashMap::new(),
        }
    }

    /// Reply text for a command, or `None` to stay silent
    pub async fn reply(&mut self, command: &str) -> Option<String> {
        let command = command.trim();

        if let Some(query) = ReadCommand::from_wire(command) {
            let model = self.model.lock().await;
            let value = match query {
                ReadCommand::Speed => model.speed.to_string(),
                ReadCommand::Battery => model.battery.to_string(),
                ReadCommand::FlightTime => format!("{}s", model.flight_time),
                ReadCommand::Wifi => "90".into(),
                ReadCommand::Sdk => "20".into(),
                ReadCommand::SerialNumber => "0TQDSIM0000001".into(),
            };
            return Some(format!("{}\r\n", value));
        }

        // Remote control is never answered
        if command.starts_with("rc ") {
            return None;
        }

        match self.policy {
            ReplyPolicy::Silent => return None,
            ReplyPolicy::Error => return Some("error".into()),
            ReplyPolicy::FailFirst(n) => {
                let count = self.seen.entry(command.to_string()).or_insert(0);
                *count += 1;
                if *count <= n {
                    return None;
                }
            }
            ReplyPolicy::Ok => {}
        }

        self.apply(command).await;
        Some("ok".into())
    }

    async fn apply(&self, command: &str) {
        let mut model = self.model.lock().await;
        let verb = command.split_whitespace().next().unwrap_or_default();
        match verb {
            "takeoff" => model.flying = true,
            "land" | "emergency" => model.flying = false,
            "streamon" => model.streaming = true,
            "streamoff" => model.streaming = false,
            "speed" => {
                if let Some(Ok(speed)) = command.split_whitespace().nth(1).map(str::parse::<u32>) {
                    model.speed = speed;
                }
            }
            _ => {}
        }
    }
}

/// Answer commands arriving on `socket` until it fails
pub async fn run(
    socket: Arc<UdpSocket>,
    mut responder: Responder,
    reply_delay: Duration,
) -> Result<()> {
    let mut buf = vec![0u8; 1024];

    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        let command = String::from_utf8_lossy(&buf[..n]).into_owned();
        info!("[SIM] {} -> {}", from, command);

        match responder.reply(&command).await {
            Some(reply) => {
                tokio::time::sleep(reply_delay).await;
                debug!("[SIM] reply: {}", reply.trim_end());
                if let Err(e) = socket.send_to(reply.as_bytes(), from).await {
                    warn!("[SIM] Failed to reply to {}: {}", from, e);
                }
            }
            None => debug!("[SIM] no reply"),
        }
    }
}
