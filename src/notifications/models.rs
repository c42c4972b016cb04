use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use crate::db::entities::endpoint;

/// Which edge of the alert state machine produced this notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Failure,
    Recovery,
}

/// One outbound job, addressed to a single channel target.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

#[derive(Debug, Clone)]
pub struct EmailContent {
    pub subject: String,
    pub body_html: String,
}

const EMAIL_WRAPPER: &str = r#"<div style="font-family: sans-serif; line-height: 1.6;">
    <h2>API Monitor Alert</h2>
    <p>{{ body | safe }}</p>
    <hr>
    <p style="font-size: 0.8em; color: #888;">This is an automated notification.</p>
</div>"#;

/// Builds the subject/body pair for an alert notification. The body is
/// rendered once per dispatch and shared by every channel job.
pub fn render_alert_email(
    kind: NotificationKind,
    endpoint: &endpoint::Model,
) -> Result<EmailContent, tera::Error> {
    let display_name = if endpoint.name.is_empty() {
        &endpoint.url
    } else {
        &endpoint.name
    };
    let now = chrono::Utc::now().to_rfc3339();

    let (subject, body) = match kind {
        NotificationKind::Failure => (
            format!("ALERT: {display_name} is DOWN"),
            format!(
                "The endpoint <strong>{}</strong> ({}) has been detected as DOWN at {}.",
                display_name, endpoint.url, now
            ),
        ),
        NotificationKind::Recovery => (
            format!("RESOLVED: {display_name} is UP Again"),
            format!(
                "The endpoint <strong>{}</strong> ({}) recovered successfully at {}.",
                display_name, endpoint.url, now
            ),
        ),
    };

    let mut context = Context::new();
    context.insert("body", &body);
    let body_html = Tera::one_off(EMAIL_WRAPPER, &context, true)?;

    Ok(EmailContent { subject, body_html })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str) -> endpoint::Model {
        endpoint::Model {
            id: 1,
            user_id: Some(1),
            url: "https://api.example.com/health".to_string(),
            name: name.to_string(),
            check_interval_sec: 60,
            is_active: true,
            is_muted: false,
            consecutive_fails: 4,
            alert_on_consecutive_fails: 4,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn failure_and_recovery_render_distinct_content() {
        let ep = endpoint("payments");
        let failure = render_alert_email(NotificationKind::Failure, &ep).unwrap();
        let recovery = render_alert_email(NotificationKind::Recovery, &ep).unwrap();

        assert_eq!(failure.subject, "ALERT: payments is DOWN");
        assert_eq!(recovery.subject, "RESOLVED: payments is UP Again");
        assert_ne!(failure.body_html, recovery.body_html);
        assert!(failure.body_html.contains("<strong>payments</strong>"));
        assert!(failure.body_html.contains(&ep.url));
    }

    #[test]
    fn unnamed_endpoints_fall_back_to_the_url() {
        let ep = endpoint("");
        let content = render_alert_email(NotificationKind::Failure, &ep).unwrap();
        assert!(content.subject.contains(&ep.url));
    }
}
