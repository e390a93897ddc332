//! Email Notifications
//!
//! [`Notifier`] is what the auth flows call; delivery is fire-and-forget.
//! [`NotificationDispatcher`] renders the messages and hands them to a
//! [`Mailer`] on a spawned task so callers never wait on the transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::User;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {status}")]
    Rejected { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Console backend for development; the body is not logged since it
/// carries the token.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "Email delivered to log backend");
        Ok(())
    }
}

/// Posts the message as JSON to a mail relay
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let response = self.client.post(&self.endpoint).json(message).send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Outbound account emails. Implementations must not block on delivery.
pub trait Notifier: Send + Sync {
    fn send_verification(&self, user: &User, token: &str);

    fn send_password_reset(&self, user: &User, token: &str);
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub frontend_url: String,
    pub from_email: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            from_email: "noreply@example.com".to_string(),
        }
    }
}

pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, config: NotificationConfig) -> Self {
        Self { mailer, config }
    }

    pub fn verification_message(&self, user: &User, token: &str) -> EmailMessage {
        let url = format!("{}/verify-email?token={}", self.frontend_url(), token);
        EmailMessage {
            from: self.config.from_email.clone(),
            to: user.email.clone(),
            subject: "Verify your email address".to_string(),
            body: format!(
                "Hi {},\n\n\
                 Thank you for registering! Please verify your email address by clicking the link below:\n\n\
                 {}\n\n\
                 This link will expire in 24 hours.\n\n\
                 If you didn't create an account, please ignore this email.\n\n\
                 Best regards,\nThe Team\n",
                user.display_name(),
                url
            ),
        }
    }

    pub fn password_reset_message(&self, user: &User, token: &str) -> EmailMessage {
        let url = format!("{}/reset-password?token={}", self.frontend_url(), token);
        EmailMessage {
            from: self.config.from_email.clone(),
            to: user.email.clone(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Hi {},\n\n\
                 You requested to reset your password. Please click the link below to set a new password:\n\n\
                 {}\n\n\
                 This link will expire in 1 hour.\n\n\
                 If you didn't request a password reset, please ignore this email.\n\n\
                 Best regards,\nThe Team\n",
                user.display_name(),
                url
            ),
        }
    }

    fn frontend_url(&self) -> &str {
        self.config.frontend_url.trim_end_matches('/')
    }

    fn dispatch(&self, kind: &'static str, message: EmailMessage) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            match mailer.send(&message).await {
                Ok(()) => info!(kind, to = %message.to, "Email sent"),
                Err(e) => error!(kind, to = %message.to, "Failed to send email: {}", e),
            }
        });
    }
}

impl Notifier for NotificationDispatcher {
    fn send_verification(&self, user: &User, token: &str) {
        self.dispatch("verification", self.verification_message(user, token));
    }

    fn send_password_reset(&self, user: &User, token: &str) {
        self.dispatch("password_reset", self.password_reset_message(user, token));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }

    fn dispatcher(mailer: Arc<dyn Mailer>) -> NotificationDispatcher {
        NotificationDispatcher::new(
            mailer,
            NotificationConfig {
                frontend_url: "https://app.acme.test/".to_string(),
                from_email: "noreply@acme.test".to_string(),
            },
        )
    }

    #[test]
    fn test_verification_message() {
        let user = User::new("jane@x.com").with_name("Jane", "Doe");
        let message = dispatcher(Arc::new(LogMailer)).verification_message(&user, "tok");
        assert_eq!(message.to, "jane@x.com");
        assert_eq!(message.from, "noreply@acme.test");
        assert!(message.body.starts_with("Hi Jane,"));
        assert!(message.body.contains("https://app.acme.test/verify-email?token=tok"));
        assert!(message.body.contains("expire in 24 hours"));
    }

    #[test]
    fn test_reset_message_greets_by_email_without_name() {
        let user = User::new("jane@x.com");
        let message = dispatcher(Arc::new(LogMailer)).password_reset_message(&user, "tok");
        assert!(message.body.starts_with("Hi jane@x.com,"));
        assert!(message.body.contains("/reset-password?token=tok"));
        assert!(message.body.contains("expire in 1 hour"));
    }

    #[tokio::test]
    async fn test_dispatch_runs_in_background() {
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = dispatcher(mailer.clone());
        dispatcher.send_verification(&User::new("jane@x.com"), "tok");

        for _ in 0..50 {
            if !mailer.sent.lock().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(mailer.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_http_mailer_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(format!("{}/send", server.uri()));
        let message = dispatcher(Arc::new(LogMailer)).verification_message(&User::new("a@x.com"), "t");
        let err = mailer.send(&message).await.unwrap_err();
        assert!(matches!(err, MailError::Rejected { status: 502 }));
    }
}
