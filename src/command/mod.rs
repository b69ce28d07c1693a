//! Command path of the client
//!
//! This module handles:
//! - Dispatching one command at a time and reading back its reply
//! - Spacing consecutive commands
//! - Retrying control commands until the drone acknowledges them

mod control;
mod dispatcher;

pub use control::ControlSender;
pub use dispatcher::CommandDispatcher;
