use crate::domain::notification::Email;
use crate::domain::ports::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;

/// Writes outgoing email to the log instead of a mail server.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        if email.to.trim().is_empty() {
            return Err(NotifyError::Rejected("empty recipient".to_string()));
        }
        tracing::info!(
            target: "email",
            to = %email.to,
            subject = %email.subject,
            body_len = email.html_body.len(),
            "email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_blank_recipient() {
        let email = Email {
            to: " ".into(),
            subject: "hi".into(),
            html_body: "<p>hi</p>".into(),
        };
        assert!(LogNotifier.send(email).await.is_err());
    }
}
