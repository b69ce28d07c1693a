//! Latest-telemetry snapshot

use bytes::Bytes;
use tokio::time::Instant;

/// The most recent state datagram received from the drone.
/// The payload is kept raw; nothing here parses it.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub payload: Bytes,
    pub received_at: Instant,
}

impl Telemetry {
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            received_at: Instant::now(),
        }
    }

    /// Payload as text, line terminators stripped
    pub fn text(&self) -> String {
        tello_shared::decode_response(&self.payload)
    }
}
