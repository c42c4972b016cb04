pub mod alert_routes;
pub mod channel_routes;
pub mod endpoint_routes;
