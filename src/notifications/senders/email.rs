//! SMTP delivery via lettre's async transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::{NotificationSender, SenderError};
use crate::config::SmtpConfig;
use crate::notifications::models::OutboundEmail;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, SenderError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| SenderError::InvalidConfiguration(format!("SMTP_FROM: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    async fn send(&self, job: &OutboundEmail) -> Result<(), SenderError> {
        let to: Mailbox = job
            .to
            .parse()
            .map_err(|e| SenderError::InvalidConfiguration(format!("recipient {}: {e}", job.to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&job.subject)
            .header(ContentType::TEXT_HTML)
            .body(job.body_html.clone())?;

        self.mailer.send(message).await?;
        debug!(to = %job.to, "SMTP delivery accepted.");
        Ok(())
    }
}
