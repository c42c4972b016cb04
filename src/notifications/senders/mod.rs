use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::models::OutboundEmail;

pub mod email;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A delivery backend for outbound notification jobs. Concrete senders
/// (SMTP today, webhooks when the reserved channel type lands) implement
/// this trait so the dispatcher stays transport-agnostic.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, job: &OutboundEmail) -> Result<(), SenderError>;
}

/// Fallback used when no SMTP transport is configured: logs the message and
/// succeeds, so alert bookkeeping keeps working in development setups.
pub struct LogOnlySender;

#[async_trait]
impl NotificationSender for LogOnlySender {
    async fn send(&self, job: &OutboundEmail) -> Result<(), SenderError> {
        info!(to = %job.to, subject = %job.subject, "SMTP not configured; logging notification instead of sending.");
        Ok(())
    }
}
