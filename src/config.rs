//! Client configuration

use anyhow::{Context, Result};
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;
use tello_shared::protocol;

/// Configuration for a Tello client. Fixed once the client is built.
#[derive(Debug, Clone)]
pub struct TelloConfig {
    /// Drone command endpoint
    pub peer: SocketAddr,
    /// Local port for command traffic (replies arrive here)
    pub command_port: u16,
    /// Local port receiving telemetry broadcasts
    pub state_port: u16,
    /// Local address the video stream is received on
    pub video_address: SocketAddr,
    /// Minimum delay between two dispatched commands
    pub command_spacing: Duration,
    /// Deadline for a single reply
    pub response_timeout: Duration,
    /// Attempts made for a control command
    pub retry_count: u32,
    /// Report exhausted control commands as errors instead of `false`
    pub enable_exceptions: bool,
    /// Receive buffer for command replies
    pub response_buffer_size: usize,
    /// Receive buffer for telemetry datagrams
    pub state_buffer_size: usize,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for TelloConfig {
    fn default() -> Self {
        Self {
            peer: SocketAddr::V4(SocketAddrV4::new(
                [192, 168, 10, 1].into(),
                protocol::COMMAND_PORT,
            )),
            command_port: protocol::COMMAND_PORT,
            state_port: protocol::STATE_PORT,
            video_address: SocketAddr::from(([0, 0, 0, 0], protocol::VIDEO_PORT)),
            command_spacing: protocol::COMMAND_SPACING,
            response_timeout: protocol::RESPONSE_TIMEOUT,
            retry_count: protocol::RETRY_COUNT,
            enable_exceptions: true,
            response_buffer_size: protocol::RESPONSE_BUFFER_SIZE,
            state_buffer_size: protocol::STATE_BUFFER_SIZE,
            event_capacity: 64,
        }
    }
}

impl TelloConfig {
    /// Defaults overlaid with `TELLO_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("TELLO_PEER") {
            config.peer = v.parse().with_context(|| format!("TELLO_PEER: {}", v))?;
        }
        if let Some(v) = lookup("TELLO_COMMAND_PORT") {
            config.command_port = v
                .parse()
                .with_context(|| format!("TELLO_COMMAND_PORT: {}", v))?;
        }
        if let Some(v) = lookup("TELLO_STATE_PORT") {
            config.state_port = v
                .parse()
                .with_context(|| format!("TELLO_STATE_PORT: {}", v))?;
        }
        if let Some(v) = lookup("TELLO_VIDEO_ADDRESS") {
            config.video_address = v
                .parse()
                .with_context(|| format!("TELLO_VIDEO_ADDRESS: {}", v))?;
        }
        if let Some(v) = lookup("TELLO_COMMAND_SPACING_MS") {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("TELLO_COMMAND_SPACING_MS: {}", v))?;
            config.command_spacing = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("TELLO_RESPONSE_TIMEOUT_MS") {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("TELLO_RESPONSE_TIMEOUT_MS: {}", v))?;
            config.response_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("TELLO_RETRY_COUNT") {
            config.retry_count = v
                .parse()
                .with_context(|| format!("TELLO_RETRY_COUNT: {}", v))?;
        }
        if let Some(v) = lookup("TELLO_ENABLE_EXCEPTIONS") {
            config.enable_exceptions = v
                .parse()
                .with_context(|| format!("TELLO_ENABLE_EXCEPTIONS: {}", v))?;
        }

        Ok(config)
    }

    /// Video address in the form external decoders expect
    pub fn video_url(&self) -> String {
        format!("udp://@{}", self.video_address)
    }
}
