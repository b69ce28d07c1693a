//! Simulator configuration

use crate::responder::ReplyPolicy;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tello_shared::protocol;

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Address the simulated drone receives commands on
    pub command_addr: SocketAddr,
    /// Where telemetry is broadcast to
    pub state_target: SocketAddr,
    /// Delay between telemetry datagrams
    pub state_interval: Duration,
    /// Delay before each reply
    pub reply_delay: Duration,
    pub policy: ReplyPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            command_addr: SocketAddr::from(([127, 0, 0, 1], protocol::COMMAND_PORT + 1000)),
            state_target: SocketAddr::from(([127, 0, 0, 1], protocol::STATE_PORT)),
            state_interval: Duration::from_millis(100),
            reply_delay: Duration::from_millis(20),
            policy: ReplyPolicy::Ok,
        }
    }
}

impl SimConfig {
    /// Defaults overlaid with `SIM_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SIM_COMMAND_ADDR") {
            config.command_addr = v
                .parse()
                .with_context(|| format!("SIM_COMMAND_ADDR: {}", v))?;
        }
        if let Ok(v) = std::env::var("SIM_STATE_TARGET") {
            config.state_target = v
                .parse()
                .with_context(|| format!("SIM_STATE_TARGET: {}", v))?;
        }
        if let Ok(v) = std::env::var("SIM_STATE_INTERVAL_MS") {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("SIM_STATE_INTERVAL_MS: {}", v))?;
            config.state_interval = Duration::from_millis(ms);
        }
        if let Ok(v) = std::env::var("SIM_REPLY_DELAY_MS") {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("SIM_REPLY_DELAY_MS: {}", v))?;
            config.reply_delay = Duration::from_millis(ms);
        }
        if let Ok(v) = std::env::var("SIM_POLICY") {
            config.policy = v.parse().with_context(|| format!("SIM_POLICY: {}", v))?;
        }

        Ok(config)
    }
}
