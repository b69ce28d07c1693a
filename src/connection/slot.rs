//! Single-slot reply mailbox shared by the ack listener and the dispatcher
//!
//! Holds at most one unconsumed reply. A second arrival before the dispatcher
//! reads the slot replaces the first (last write wins); nothing is queued.

use bytes::Bytes;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Default)]
pub struct ResponseSlot {
    value: Mutex<Option<Bytes>>,
    notify: Notify,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Bytes>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a reply, returning any unconsumed reply it replaced
    pub fn put(&self, payload: Bytes) -> Option<Bytes> {
        let replaced = self.lock().replace(payload);
        self.notify.notify_one();
        replaced
    }

    /// Read and clear the slot
    pub fn take(&self) -> Option<Bytes> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    /// Wait until a reply is available or `deadline` passes.
    ///
    /// On success the slot is cleared. On expiry the slot is left untouched,
    /// so a reply that lands afterwards is picked up by the next caller.
    pub async fn take_until(&self, deadline: Instant) -> Option<Bytes> {
        loop {
            let notified = self.notify.notified();
            if let Some(payload) = self.take() {
                return Some(payload);
            }
            if timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }
}
