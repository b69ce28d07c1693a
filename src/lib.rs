//! Tello Driver
//!
//! Client for the Tello UDP text-command protocol. Commands go out one at a
//! time on the command port; replies are read back by a background listener
//! and correlated purely by arrival order. A second listener keeps the latest
//! telemetry datagram from the state port.

pub mod command;
pub mod config;
pub mod connection;
pub mod drone;
pub mod transport;
pub mod video;

pub use config::TelloConfig;
pub use connection::{ListenerStatus, Telemetry, TelloEvent};
pub use drone::Tello;
pub use tello_shared::{Direction, Listener, ReadCommand, Rotation, TelloCommand, TelloError};
