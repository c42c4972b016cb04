//! The failure/alert state machine.
//!
//! `transitions` holds the pure decision logic; [`AlertEngine`] applies a
//! decision to the store (counter, alert rows), publishes the resulting
//! events and hands notification intents to the dispatcher.

pub mod engine;
pub mod transitions;

pub use engine::AlertEngine;
pub use transitions::{on_failure, on_success, EndpointHealth, RecoveryAction};
