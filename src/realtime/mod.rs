pub mod events;
pub mod hub;

pub use events::{EndpointStatePayload, WsMessage};
pub use hub::{EventHub, WsEvent};
