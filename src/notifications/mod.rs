pub mod dispatcher;
pub mod models;
pub mod senders;

pub use dispatcher::NotificationDispatcher;
pub use models::{NotificationKind, OutboundEmail};
