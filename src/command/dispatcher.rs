//! Command dispatcher - sends one command at a time and reads back its reply

use crate::connection::{ListenerStatus, ResponseSlot, TelloEvent};
use crate::transport::DatagramEndpoint;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tello_shared::{decode_response, Listener, TelloError};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// Timing of the last exchange, owned by whoever holds the dispatch lock
#[derive(Debug, Default)]
struct DispatchSession {
    last_sent: Option<Instant>,
    last_received: Option<Instant>,
}

/// Dispatches commands to the drone and correlates replies.
///
/// Only one command is ever in flight: callers queue on an internal lock that
/// is held from the spacing delay through the reply (or timeout).
pub struct CommandDispatcher {
    endpoint: Arc<dyn DatagramEndpoint>,
    peer: SocketAddr,
    slot: Arc<ResponseSlot>,
    ack_status: watch::Receiver<ListenerStatus>,
    events: broadcast::Sender<TelloEvent>,
    command_spacing: Duration,
    response_timeout: Duration,
    session: Mutex<DispatchSession>,
}

impl CommandDispatcher {
    /// Create a new command dispatcher
    pub fn new(
        endpoint: Arc<dyn DatagramEndpoint>,
        peer: SocketAddr,
        slot: Arc<ResponseSlot>,
        ack_status: watch::Receiver<ListenerStatus>,
        events: broadcast::Sender<TelloEvent>,
        command_spacing: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            peer,
            slot,
            ack_status,
            events,
            command_spacing,
            response_timeout,
            session: Mutex::new(DispatchSession::default()),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// When the last reply was read back, if ever
    pub async fn last_received(&self) -> Option<Instant> {
        self.session.lock().await.last_received
    }

    fn ack_listener_stopped(&self) -> Option<String> {
        match &*self.ack_status.borrow() {
            ListenerStatus::Running => None,
            ListenerStatus::Stopped { reason } => Some(reason.clone()),
        }
    }

    /// Send a command and wait for its reply.
    ///
    /// Returns the reply text with line terminators stripped, or
    /// `TelloError::Timeout` if nothing arrives within the response timeout.
    /// A reply that arrives after the timeout stays in the slot and is
    /// returned to the next caller.
    pub async fn send_command(&self, command: &str) -> Result<String, TelloError> {
        let mut session = self.session.lock().await;

        if let Some(last_sent) = session.last_sent {
            let elapsed = last_sent.elapsed();
            if elapsed < self.command_spacing {
                sleep(self.command_spacing - elapsed).await;
            }
        }

        if let Some(reason) = self.ack_listener_stopped() {
            warn!("[CMD] Not sending '{}': ack listener stopped", command);
            return Err(TelloError::ListenerStopped {
                listener: Listener::Ack,
                reason,
            });
        }

        info!("[CMD] Send command: {}", command);
        let sent_at = Instant::now();
        let deadline = sent_at + self.response_timeout;

        // A failed send still counts as a dispatch for spacing
        session.last_sent = Some(sent_at);
        self.endpoint.send_to(command.as_bytes(), self.peer).await?;
        let _ = self.events.send(TelloEvent::CommandSent {
            command: command.to_string(),
        });

        let payload = match self.slot.take_until(deadline).await {
            Some(payload) => payload,
            None => {
                warn!("[CMD] Timeout exceeded on command {}", command);
                let _ = self.events.send(TelloEvent::Timeout {
                    command: command.to_string(),
                    timeout: self.response_timeout,
                });
                return Err(TelloError::Timeout {
                    command: command.to_string(),
                    timeout: self.response_timeout,
                });
            }
        };

        let response = decode_response(&payload);
        info!("[CMD] Response from Tello: {}", response);
        session.last_received = Some(Instant::now());
        let _ = self.events.send(TelloEvent::ResponseReceived {
            command: command.to_string(),
            response: response.clone(),
        });

        Ok(response)
    }

    /// Send a command without waiting for or reading any reply
    pub async fn send_command_noreturn(&self, command: &str) -> Result<(), TelloError> {
        info!("[CMD] Send command (w/ no response): {}", command);
        self.endpoint.send_to(command.as_bytes(), self.peer).await?;
        let _ = self.events.send(TelloEvent::CommandSent {
            command: command.to_string(),
        });
        Ok(())
    }
}
