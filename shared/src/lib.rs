//! Tello Shared Protocol Types
//!
//! This crate provides the wire constants, command vocabulary and error
//! type shared by the Tello driver and the simulated drone peer.

pub mod commands;
pub mod error;

pub use commands::{
    clamp_angle, clamp_distance, clamp_rc, clamp_speed, Direction, ReadCommand, Rotation,
    TelloCommand,
};
pub use error::{Listener, TelloError};

/// Wire-level parameters of the Tello SDK
pub mod protocol {
    use std::time::Duration;

    /// Default drone address in AP mode
    pub const DEFAULT_PEER_IP: &str = "192.168.10.1";

    /// Port the drone listens on for commands
    pub const COMMAND_PORT: u16 = 8889;

    /// Local port the drone broadcasts telemetry to
    pub const STATE_PORT: u16 = 8890;

    /// Local port the drone streams raw video to
    pub const VIDEO_PORT: u16 = 11111;

    /// Reply that marks a control command as successful (case-insensitive)
    pub const SUCCESS_TOKEN: &str = "ok";

    /// Minimum spacing between two dispatched commands
    pub const COMMAND_SPACING: Duration = Duration::from_millis(500);

    /// How long a dispatched command waits for its reply
    pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(7);

    /// Attempts made for a control command before giving up
    pub const RETRY_COUNT: u32 = 3;

    /// Receive buffer for command replies
    pub const RESPONSE_BUFFER_SIZE: usize = 1024;

    /// Receive buffer for telemetry datagrams. State lines run past 150 bytes.
    pub const STATE_BUFFER_SIZE: usize = 1024;
}

/// Decode a reply datagram into text, dropping trailing line terminators
pub fn decode_response(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Check whether a decoded reply is the control-command success token
pub fn is_success_token(response: &str) -> bool {
    response.eq_ignore_ascii_case(protocol::SUCCESS_TOKEN)
}
