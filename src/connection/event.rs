//! Structured events published by the client

use std::time::Duration;
use tello_shared::Listener;

/// Events emitted while talking to the drone
#[derive(Debug, Clone, PartialEq)]
pub enum TelloEvent {
    /// A command was written to the command endpoint
    CommandSent { command: String },
    /// A reply was read back for a command
    ResponseReceived { command: String, response: String },
    /// No reply arrived before the deadline
    Timeout { command: String, timeout: Duration },
    /// A control command exhausted its attempts
    CommandFailed {
        command: String,
        response: Option<String>,
        attempts: u32,
    },
    /// A background listener terminated
    ListenerStopped { listener: Listener, reason: String },
    /// Video stream switched on and decode source opened
    StreamStarted { address: String },
    /// Video stream switched off and decode source released
    StreamStopped,
}
