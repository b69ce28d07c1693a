//! Background receive loops
//!
//! Each listener owns one endpoint and publishes whatever arrives on it. A
//! receive failure ends the loop for good: the status flips to `Stopped` and
//! a `ListenerStopped` event is emitted, but nothing is re-raised into the
//! foreground caller and the loop is never restarted.

use super::event::TelloEvent;
use super::slot::ResponseSlot;
use super::telemetry::Telemetry;
use crate::transport::DatagramEndpoint;
use bytes::Bytes;
use std::sync::Arc;
use tello_shared::Listener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// Liveness of a background listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerStatus {
    Running,
    Stopped { reason: String },
}

/// Handle to a spawned listener. Dropping it aborts the task.
pub struct ListenerHandle {
    kind: Listener,
    status_tx: Arc<watch::Sender<ListenerStatus>>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn kind(&self) -> Listener {
        self.kind
    }

    /// Current status
    pub fn status(&self) -> ListenerStatus {
        self.status_tx.borrow().clone()
    }

    /// Watch for status changes
    pub fn subscribe(&self) -> watch::Receiver<ListenerStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.status_tx.borrow(), ListenerStatus::Running)
    }

    /// Stop the loop
    pub fn shutdown(&self) {
        if self.is_running() {
            self.task.abort();
            self.status_tx.send_replace(ListenerStatus::Stopped {
                reason: "shut down".into(),
            });
            info!("[{}] Listener shut down", tag(self.kind));
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn tag(kind: Listener) -> &'static str {
    match kind {
        Listener::Ack => "ACK",
        Listener::State => "STATE",
    }
}

/// Spawn a listener that hands every received datagram to `publish`
pub fn spawn_listener<F>(
    kind: Listener,
    endpoint: Arc<dyn DatagramEndpoint>,
    buffer_size: usize,
    events: broadcast::Sender<TelloEvent>,
    publish: F,
) -> ListenerHandle
where
    F: Fn(Bytes) + Send + 'static,
{
    let (status_tx, _) = watch::channel(ListenerStatus::Running);
    let status_tx = Arc::new(status_tx);

    let status_clone = status_tx.clone();
    let task = tokio::spawn(async move {
        let mut buf = vec![0u8; buffer_size];

        loop {
            match endpoint.recv_from(&mut buf).await {
                Ok((n, from)) => {
                    trace!("[{}] {} bytes from {}", tag(kind), n, from);
                    publish(Bytes::copy_from_slice(&buf[..n]));
                }
                Err(e) => {
                    error!("[{}] Receive failed, listener stopping: {}", tag(kind), e);
                    let reason = e.to_string();
                    status_clone.send_replace(ListenerStatus::Stopped {
                        reason: reason.clone(),
                    });
                    let _ = events.send(TelloEvent::ListenerStopped {
                        listener: kind,
                        reason,
                    });
                    break;
                }
            }
        }
    });

    ListenerHandle {
        kind,
        status_tx,
        task,
    }
}

/// Listener that overwrites the reply slot with each command-endpoint datagram.
///
/// It has no idea which command a datagram answers: correlation is purely by
/// arrival order under the one-command-in-flight rule.
pub fn spawn_ack_listener(
    endpoint: Arc<dyn DatagramEndpoint>,
    buffer_size: usize,
    slot: Arc<ResponseSlot>,
    events: broadcast::Sender<TelloEvent>,
) -> ListenerHandle {
    spawn_listener(Listener::Ack, endpoint, buffer_size, events, move |payload| {
        if let Some(stale) = slot.put(payload) {
            debug!(
                "[ACK] Unconsumed reply overwritten: {}",
                tello_shared::decode_response(&stale)
            );
        }
    })
}

/// Listener that replaces the telemetry snapshot with each state datagram
pub fn spawn_state_listener(
    endpoint: Arc<dyn DatagramEndpoint>,
    buffer_size: usize,
    snapshot: watch::Sender<Option<Telemetry>>,
    events: broadcast::Sender<TelloEvent>,
) -> ListenerHandle {
    spawn_listener(Listener::State, endpoint, buffer_size, events, move |payload| {
        snapshot.send_replace(Some(Telemetry::new(payload)));
    })
}
