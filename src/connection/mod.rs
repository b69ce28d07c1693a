//! Receive side of the client: background listeners and the state they publish

pub mod event;
pub mod listener;
pub mod slot;
pub mod telemetry;

pub use event::TelloEvent;
pub use listener::{
    spawn_ack_listener, spawn_listener, spawn_state_listener, ListenerHandle, ListenerStatus,
};
pub use slot::ResponseSlot;
pub use telemetry::Telemetry;
