//! Retry layer for control commands

use super::dispatcher::CommandDispatcher;
use crate::connection::TelloEvent;
use std::sync::Arc;
use tello_shared::{is_success_token, TelloError};
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Sends control commands, retrying until the drone answers with the success token
pub struct ControlSender {
    dispatcher: Arc<CommandDispatcher>,
    retry_count: u32,
    events: broadcast::Sender<TelloEvent>,
}

impl ControlSender {
    pub fn new(
        dispatcher: Arc<CommandDispatcher>,
        retry_count: u32,
        events: broadcast::Sender<TelloEvent>,
    ) -> Self {
        Self {
            dispatcher,
            retry_count,
            events,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Send a control command up to `retry_count` times.
    ///
    /// Succeeds on the first reply equal to "ok" in any case. Timeouts and
    /// any other reply count as failed attempts. Exhausting all attempts
    /// yields `TelloError::CommandFailed` carrying the last reply seen.
    ///
    /// `attempts` counts only datagrams actually sent: a stopped ack listener
    /// aborts the loop before anything goes out.
    pub async fn send_control_command(&self, command: &str) -> Result<(), TelloError> {
        let mut last_response = None;
        let mut attempts = 0;

        for attempt in 1..=self.retry_count {
            match self.dispatcher.send_command(command).await {
                Ok(response) if is_success_token(&response) => return Ok(()),
                Ok(response) => {
                    attempts = attempt;
                    debug!(
                        "[CMD] '{}' attempt {}/{} answered: {}",
                        command, attempt, self.retry_count, response
                    );
                    last_response = Some(response);
                }
                Err(TelloError::Timeout { .. }) => {
                    attempts = attempt;
                    debug!(
                        "[CMD] '{}' attempt {}/{} timed out",
                        command, attempt, self.retry_count
                    );
                }
                // Retrying cannot help once the ack listener is gone
                Err(e @ TelloError::ListenerStopped { .. }) => {
                    error!("[CMD] '{}' abandoned: {}", command, e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        error!(
            "[CMD] Command {} was unsuccessful. Response from Tello: {}",
            command,
            last_response.as_deref().unwrap_or("<none>")
        );
        let _ = self.events.send(TelloEvent::CommandFailed {
            command: command.to_string(),
            response: last_response.clone(),
            attempts,
        });

        Err(TelloError::CommandFailed {
            command: command.to_string(),
            response: last_response,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::dispatcher::tests::harness;
    use std::time::Duration;

    fn control(h: &crate::command::dispatcher::tests::Harness, retries: u32) -> ControlSender {
        let (events, _) = broadcast::channel(8);
        ControlSender::new(h.dispatcher.clone(), retries, events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_ok_succeeds_after_one_dispatch() {
        let h = harness(Duration::from_millis(500), Duration::from_secs(7));
        let sender = control(&h, 3);
        let (_task, seen) = h.peer.respond_with(|_| Some("ok".into()));

        sender.send_control_command("takeoff").await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["takeoff".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uppercase_token_accepted() {
        let h = harness(Duration::from_millis(500), Duration::from_secs(7));
        let sender = control(&h, 3);
        let (_task, _seen) = h.peer.respond_with(|_| Some("OK\r\n".into()));

        assert!(sender.send_control_command("land").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_exhausts_retries() {
        let h = harness(Duration::from_millis(500), Duration::from_secs(7));
        let (events, mut failures) = broadcast::channel(8);
        let sender = ControlSender::new(h.dispatcher.clone(), 3, events);
        let (_task, seen) = h.peer.respond_with(|_| None);

        let err = sender.send_control_command("takeoff").await.unwrap_err();
        match err {
            TelloError::CommandFailed {
                command,
                response,
                attempts,
            } => {
                assert_eq!(command, "takeoff");
                assert_eq!(response, None);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(seen.lock().unwrap().len(), 3);

        assert_eq!(
            failures.recv().await.unwrap(),
            TelloEvent::CommandFailed {
                command: "takeoff".into(),
                response: None,
                attempts: 3,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_then_ok_retries() {
        let h = harness(Duration::from_millis(500), Duration::from_secs(7));
        let sender = control(&h, 3);
        let mut replies = vec!["error", "error", "ok"].into_iter();
        let (_task, seen) = h.peer.respond_with(move |_| replies.next().map(String::from));

        sender.send_control_command("cw 90").await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reports_last_response() {
        let h = harness(Duration::from_millis(500), Duration::from_secs(7));
        let sender = control(&h, 2);
        let (_task, seen) = h.peer.respond_with(|_| Some("error Not joystick".into()));

        let err = sender.send_control_command("forward 50").await.unwrap_err();
        assert!(matches!(
            err,
            TelloError::CommandFailed { response: Some(ref r), attempts: 2, .. } if r == "error Not joystick"
        ));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_listener_is_not_retried() {
        let mut h = harness(Duration::from_millis(500), Duration::from_secs(7));
        let sender = control(&h, 3);
        h.listener.shutdown();

        let err = sender.send_control_command("takeoff").await.unwrap_err();
        assert!(matches!(err, TelloError::CommandFailed { attempts: 0, .. }));
        assert!(h.peer.try_next_sent().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_stopping_mid_retry_counts_sent_attempts() {
        let h = harness(Duration::from_millis(500), Duration::from_secs(7));
        let sender = control(&h, 3);
        let listener = h.listener;
        let (_task, seen) = h.peer.respond_with(move |_| {
            listener.shutdown();
            Some("error".into())
        });

        let err = sender.send_control_command("takeoff").await.unwrap_err();
        assert!(matches!(err, TelloError::CommandFailed { attempts: 1, .. }));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
