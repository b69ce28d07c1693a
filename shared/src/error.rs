//! Error type for the Tello driver

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Background receive loops owned by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// Receives command replies on the command endpoint
    Ack,
    /// Receives telemetry on the state endpoint
    State,
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Ack => write!(f, "ack"),
            Listener::State => write!(f, "state"),
        }
    }
}

/// Errors that can occur while talking to the drone
#[derive(Error, Debug)]
pub enum TelloError {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Timeout exceeded on command '{command}' after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error(
        "Command '{}' was unsuccessful after {} attempt(s). Response from Tello: {}",
        .command,
        .attempts,
        .response.as_deref().unwrap_or("<none>")
    )]
    CommandFailed {
        command: String,
        response: Option<String>,
        attempts: u32,
    },

    #[error("The {listener} listener has stopped: {reason}")]
    ListenerStopped { listener: Listener, reason: String },

    #[error("Unexpected response to '{command}': {response}")]
    UnexpectedResponse { command: String, response: String },

    #[error("Video error: {0}")]
    Video(String),
}

impl TelloError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TelloError::Timeout { .. })
    }
}
