//! Notification delivery.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use super::Notification;

/// Errors from a dispatcher. The service logs these; they never undo a
/// persisted step.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Notification transport unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Hands rendered notifications to whatever delivers them.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Logs notifications instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        tracing::info!(
            job_number = notification.job_number,
            step = %notification.step,
            subject = %notification.subject,
            "Skipping notification send"
        );
        Ok(())
    }
}

/// Publishes notifications on a tokio broadcast channel so an external
/// mailer (or a test) can subscribe.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    sender: Arc<broadcast::Sender<Notification>>,
}

impl BroadcastDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Dispatcher for BroadcastDispatcher {
    fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Recipient;
    use crate::workflow::Step;

    fn notification() -> Notification {
        Notification {
            from: "noreply@example.com".to_string(),
            to: Recipient::Worker,
            cc: vec![Recipient::Agent("alice".to_string())],
            subject: "New maintenance request by alice".to_string(),
            body: "alice has made a new maintenance request.".to_string(),
            job_number: 1,
            step: Step::Create,
        }
    }

    #[test]
    fn test_broadcast_reaches_subscribers() {
        let dispatcher = BroadcastDispatcher::new(8);
        let mut rx = dispatcher.subscribe();
        assert_eq!(dispatcher.subscriber_count(), 1);

        dispatcher.dispatch(&notification()).unwrap();

        let received = rx.try_recv().unwrap();
        assert_eq!(received, notification());
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        let dispatcher = BroadcastDispatcher::new(8);
        assert!(dispatcher.dispatch(&notification()).is_ok());
    }

    #[test]
    fn test_log_dispatcher_never_fails() {
        assert!(LogDispatcher.dispatch(&notification()).is_ok());
    }
}
