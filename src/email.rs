//! Outbound notification emails. Sends are fire-and-forget: the HTTP
//! response never waits on SMTP, and a failed send is logged, not surfaced.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::debug;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("invalid email configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to send email: {0}")]
    SendFailed(String),
}

/// The notifications the service sends.
#[derive(Debug, Clone)]
pub enum Notification {
    Welcome { to: String, username: String },
    TaskAssigned { to: String, task_title: String, assigned_by: String },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::Welcome { to, .. } => to,
            Notification::TaskAssigned { to, .. } => to,
        }
    }

    fn subject(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "Welcome to Task Management System",
            Notification::TaskAssigned { .. } => "New Task Assigned",
        }
    }

    fn body(&self) -> String {
        match self {
            Notification::Welcome { username, .. } => format!(
                "Hi {username},\n\nYour account has been created. You can now log in and start tracking your tasks.\n"
            ),
            Notification::TaskAssigned { task_title, assigned_by, .. } => format!(
                "A new task has been assigned to you by {assigned_by}:\n\n  {task_title}\n\nLog in to view the details.\n"
            ),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), EmailError>;
}

/// Sink used when no SMTP host is configured. Logs and drops.
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn send(&self, notification: Notification) -> Result<(), EmailError> {
        debug!(to = notification.recipient(), subject = notification.subject(), "email disabled, dropping notification");
        Ok(())
    }
}

/// SMTP-backed sink.
pub struct SmtpSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpSink {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| EmailError::InvalidConfig(format!("SMTP relay error: {e}")))?
            .port(config.port);
        if let (Some(user), Some(pass)) = (config.user.clone(), config.password.clone()) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for SmtpSink {
    async fn send(&self, notification: Notification) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| EmailError::InvalidConfig(format!("Invalid from address: {e}")))?,
            )
            .to(notification
                .recipient()
                .parse()
                .map_err(|e| EmailError::InvalidConfig(format!("Invalid to address: {e}")))?)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())
            .map_err(|e| EmailError::SendFailed(format!("Failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_are_stable() {
        let welcome = Notification::Welcome { to: "a@b.co".into(), username: "a".into() };
        assert_eq!(welcome.subject(), "Welcome to Task Management System");
        let assigned = Notification::TaskAssigned {
            to: "a@b.co".into(),
            task_title: "ship it".into(),
            assigned_by: "boss".into(),
        };
        assert_eq!(assigned.subject(), "New Task Assigned");
        assert!(assigned.body().contains("ship it"));
        assert!(assigned.body().contains("boss"));
    }

    #[tokio::test]
    async fn noop_sink_always_succeeds() {
        let sink = NoopSink;
        let n = Notification::Welcome { to: "a@b.co".into(), username: "a".into() };
        assert!(sink.send(n).await.is_ok());
    }
}
