//! Domain events pushed to connected clients.
//!
//! The wire shape is a `{type, payload}` envelope; the variant tag is the
//! event type string the frontend switches on. One tagged variant per event
//! type keeps the publish/consume boundary exhaustive.

use serde::Serialize;

use crate::db::entities::{alert, endpoint_metric};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum WsMessage {
    MetricRecorded(endpoint_metric::Model),
    EndpointStateChanged(EndpointStatePayload),
    AlertTriggered(alert::Model),
    AlertResolved(alert::Model),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatePayload {
    pub endpoint_id: i32,
    pub is_active: bool,
    pub consecutive_fails: i32,
    pub has_open_alert: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::AlertStatus;

    #[test]
    fn envelope_has_type_and_payload() {
        let msg = WsMessage::EndpointStateChanged(EndpointStatePayload {
            endpoint_id: 3,
            is_active: true,
            consecutive_fails: 2,
            has_open_alert: false,
        });

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "endpoint-state-changed");
        assert_eq!(value["payload"]["endpointId"], 3);
        assert_eq!(value["payload"]["consecutiveFails"], 2);
    }

    #[test]
    fn alert_events_use_kebab_case_types() {
        let alert = alert::Model {
            id: 1,
            endpoint_id: 3,
            status: AlertStatus::Triggered,
            message: "Endpoint is down (status code: 503)".to_string(),
            created_at: chrono::Utc::now(),
            resolved_at: None,
        };

        let triggered = serde_json::to_value(WsMessage::AlertTriggered(alert.clone())).unwrap();
        assert_eq!(triggered["type"], "alert-triggered");

        let resolved = serde_json::to_value(WsMessage::AlertResolved(alert)).unwrap();
        assert_eq!(resolved["type"], "alert-resolved");
        assert_eq!(resolved["payload"]["endpointId"], 3);
    }
}
