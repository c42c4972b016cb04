//! Turns a notification intent into one enqueued outbound job per channel.
//!
//! Jobs flow through a bounded queue into a worker loop with its own
//! concurrency limit, so slow SMTP conversations never hold up a check
//! cycle. Failures are isolated per channel: one bad address does not stop
//! the remaining channels and never rolls back alert state.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use super::models::{render_alert_email, NotificationKind, OutboundEmail};
use super::senders::NotificationSender;
use crate::db::entities::{endpoint, notification_channel};
use crate::db::enums::ChannelType;

const DISPATCH_QUEUE_CAPACITY: usize = 256;
const DISPATCH_CONCURRENCY: usize = 10;

pub struct NotificationDispatcher {
    job_tx: mpsc::Sender<OutboundEmail>,
}

impl NotificationDispatcher {
    /// Spawns the worker loop draining the job queue through `sender`.
    pub fn start(sender: Arc<dyn NotificationSender>) -> Self {
        let (job_tx, mut job_rx) = mpsc::channel::<OutboundEmail>(DISPATCH_QUEUE_CAPACITY);

        tokio::spawn(async move {
            let permits = Arc::new(Semaphore::new(DISPATCH_CONCURRENCY));
            while let Some(job) = job_rx.recv().await {
                let permit = match Arc::clone(&permits).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let sender = Arc::clone(&sender);
                tokio::spawn(async move {
                    let _permit = permit;
                    match sender.send(&job).await {
                        Ok(()) => info!(to = %job.to, "Notification delivered."),
                        Err(e) => error!(to = %job.to, error = %e, "Failed to send notification."),
                    }
                });
            }
            info!("Notification dispatch queue closed.");
        });

        Self { job_tx }
    }

    /// Enqueues one job per EMAIL channel. Unsupported channel types are
    /// skipped; an owner with no usable channel gets a configuration warning
    /// but the caller's alert bookkeeping stands.
    pub async fn dispatch(
        &self,
        endpoint: &endpoint::Model,
        channels: &[notification_channel::Model],
        kind: NotificationKind,
    ) {
        let email_channels: Vec<_> = channels
            .iter()
            .filter(|channel| match channel.channel_type {
                ChannelType::Email => true,
                ChannelType::Webhook => {
                    debug!(channel_id = channel.id, "Skipping unsupported channel type WEBHOOK.");
                    false
                }
            })
            .collect();

        if email_channels.is_empty() {
            warn!(
                endpoint_id = endpoint.id,
                "No usable notification channels configured; {kind:?} notification skipped."
            );
            return;
        }

        let content = match render_alert_email(kind, endpoint) {
            Ok(content) => content,
            Err(e) => {
                error!(endpoint_id = endpoint.id, error = %e, "Failed to render notification email.");
                return;
            }
        };

        for channel in email_channels {
            let job = OutboundEmail {
                to: channel.target.clone(),
                subject: content.subject.clone(),
                body_html: content.body_html.clone(),
            };
            match self.job_tx.try_send(job) {
                Ok(()) => {
                    info!(
                        endpoint_id = endpoint.id,
                        channel_id = channel.id,
                        "Queued {kind:?} notification."
                    );
                }
                Err(e) => {
                    // Partial delivery is acceptable; keep going with the rest.
                    error!(
                        endpoint_id = endpoint.id,
                        channel_id = channel.id,
                        error = %e,
                        "Failed to enqueue notification job."
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    use crate::notifications::senders::SenderError;

    #[derive(Default)]
    struct RecordingSender {
        jobs: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, job: &OutboundEmail) -> Result<(), SenderError> {
            self.jobs.lock().await.push(job.clone());
            Ok(())
        }
    }

    fn endpoint() -> endpoint::Model {
        endpoint::Model {
            id: 1,
            user_id: Some(1),
            url: "https://api.example.com".to_string(),
            name: "api".to_string(),
            check_interval_sec: 60,
            is_active: true,
            is_muted: false,
            consecutive_fails: 4,
            alert_on_consecutive_fails: 4,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn channel(id: i32, channel_type: ChannelType, target: &str) -> notification_channel::Model {
        notification_channel::Model {
            id,
            user_id: 1,
            channel_type,
            target: target.to_string(),
            is_default: id == 1,
            created_at: chrono::Utc::now(),
        }
    }

    async fn wait_for_jobs(sender: &RecordingSender, expected: usize) -> Vec<OutboundEmail> {
        for _ in 0..100 {
            {
                let jobs = sender.jobs.lock().await;
                if jobs.len() >= expected {
                    return jobs.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sender.jobs.lock().await.clone()
    }

    #[tokio::test]
    async fn one_job_per_email_channel_and_webhooks_filtered() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = NotificationDispatcher::start(sender.clone());

        let channels = vec![
            channel(1, ChannelType::Email, "a@example.com"),
            channel(2, ChannelType::Webhook, "https://hooks.example.com"),
            channel(3, ChannelType::Email, "b@example.com"),
        ];
        dispatcher
            .dispatch(&endpoint(), &channels, NotificationKind::Failure)
            .await;

        let jobs = wait_for_jobs(&sender, 2).await;
        assert_eq!(jobs.len(), 2);
        let recipients: Vec<_> = jobs.iter().map(|j| j.to.as_str()).collect();
        assert!(recipients.contains(&"a@example.com"));
        assert!(recipients.contains(&"b@example.com"));
        assert!(jobs.iter().all(|j| j.subject.starts_with("ALERT:")));
    }

    #[tokio::test]
    async fn no_channels_means_no_jobs() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = NotificationDispatcher::start(sender.clone());

        dispatcher
            .dispatch(&endpoint(), &[], NotificationKind::Recovery)
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sender.jobs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn recovery_jobs_carry_the_resolved_subject() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = NotificationDispatcher::start(sender.clone());

        let channels = vec![channel(1, ChannelType::Email, "a@example.com")];
        dispatcher
            .dispatch(&endpoint(), &channels, NotificationKind::Recovery)
            .await;

        let jobs = wait_for_jobs(&sender, 1).await;
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].subject.starts_with("RESOLVED:"));
    }
}
