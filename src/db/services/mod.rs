//! High-level database access for the rest of the application.
//!
//! Handlers and the monitoring pipeline go through these functions instead of
//! building queries inline, so the schema stays an implementation detail of
//! this module. One sub-module per domain entity.

pub mod alert_service;
pub mod channel_service;
pub mod endpoint_service;
pub mod metric_service;
pub mod user_service;

pub use alert_service::*;
pub use channel_service::*;
pub use endpoint_service::*;
pub use metric_service::*;
pub use user_service::*;
