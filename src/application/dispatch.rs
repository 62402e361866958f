use crate::domain::notification::Email;
use crate::domain::order::OrderId;
use crate::domain::ports::SharedNotifier;
use std::time::Duration;

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Fire-and-forget email delivery.
///
/// Each email is attempted once. Failures and timeouts are logged and
/// reported as `false`, never as an error.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: SharedNotifier,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: SharedNotifier) -> Self {
        Self {
            notifier,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub async fn dispatch(&self, order: OrderId, email: Email) -> bool {
        let subject = email.subject.clone();
        match tokio::time::timeout(self.send_timeout, self.notifier.send(email)).await {
            Ok(Ok(())) => {
                tracing::debug!(order = %order, %subject, "notification delivered");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(order = %order, %subject, error = %e, "notification failed");
                false
            }
            Err(_) => {
                tracing::warn!(order = %order, %subject, timeout = ?self.send_timeout, "notification timed out");
                false
            }
        }
    }
}
