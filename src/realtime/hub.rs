//! Per-user event fan-out.
//!
//! Each user with at least one live WebSocket connection owns a broadcast
//! channel in the hub; publishing to a user with no subscribers is a
//! fire-and-forget no-op. Missed events are never replayed — history is
//! served by the metrics/alerts query API instead.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use super::events::WsMessage;

/// Events are shared, not cloned, across a user's connections.
pub type WsEvent = Arc<WsMessage>;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
pub struct EventHub {
    channels: DashMap<i32, broadcast::Sender<WsEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an event on the user's channel. Succeeds whether or not
    /// anyone is listening; a send error just means no live subscriber.
    pub fn publish(&self, user_id: i32, message: WsMessage) {
        if let Some(tx) = self.channels.get(&user_id) {
            if tx.send(Arc::new(message)).is_err() {
                debug!(user_id, "No live subscriber for event; dropped.");
            }
        } else {
            debug!(user_id, "No channel registered for user; event not forwarded.");
        }
    }

    /// Subscribes one connection. Multiple devices of the same user each get
    /// their own receiver on the shared channel, so every event is delivered
    /// once per connection.
    pub fn subscribe(&self, user_id: i32) -> broadcast::Receiver<WsEvent> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Called after a connection's receiver is dropped; prunes the channel
    /// once the last connection for that user is gone.
    pub fn disconnect(&self, user_id: i32) {
        self.channels
            .remove_if(&user_id, |_, tx| tx.receiver_count() == 0);
    }

    /// Number of users with at least one registered channel.
    pub fn user_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::EndpointStatePayload;

    fn state_event(endpoint_id: i32) -> WsMessage {
        WsMessage::EndpointStateChanged(EndpointStatePayload {
            endpoint_id,
            is_active: true,
            consecutive_fails: 0,
            has_open_alert: false,
        })
    }

    #[tokio::test]
    async fn publish_without_subscriber_succeeds_and_is_not_replayed() {
        let hub = EventHub::new();
        hub.publish(1, state_event(10));

        // Connecting afterwards must not deliver the earlier event.
        let mut rx = hub.subscribe(1);
        hub.publish(1, state_event(11));

        let first = rx.recv().await.unwrap();
        match first.as_ref() {
            WsMessage::EndpointStateChanged(payload) => assert_eq!(payload.endpoint_id, 11),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn each_connection_gets_its_own_delivery() {
        let hub = EventHub::new();
        let mut laptop = hub.subscribe(1);
        let mut phone = hub.subscribe(1);

        hub.publish(1, state_event(5));

        assert!(laptop.recv().await.is_ok());
        assert!(phone.recv().await.is_ok());
    }

    #[tokio::test]
    async fn events_are_scoped_to_the_owning_user() {
        let hub = EventHub::new();
        let mut other_user = hub.subscribe(2);

        hub.publish(1, state_event(5));

        assert!(other_user.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_prunes_idle_channels() {
        let hub = EventHub::new();
        let rx = hub.subscribe(1);
        assert_eq!(hub.user_count(), 1);

        drop(rx);
        hub.disconnect(1);
        assert_eq!(hub.user_count(), 0);

        // A user with a second live connection is kept.
        let _keep = hub.subscribe(2);
        let rx2 = hub.subscribe(2);
        drop(rx2);
        hub.disconnect(2);
        assert_eq!(hub.user_count(), 1);
    }
}
