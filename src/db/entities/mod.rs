//! SeaORM entities mapping to the database tables.
//!
//! Each entity lives in its own module; the `prelude` re-exports the common
//! aliases used across the services layer.

pub mod alert;
pub mod endpoint;
pub mod endpoint_metric;
pub mod notification_channel;
pub mod user;

pub mod prelude {
    pub use super::alert::Entity as Alert;
    pub use super::alert::Model as AlertModel;

    pub use super::endpoint::Entity as Endpoint;
    pub use super::endpoint::Model as EndpointModel;

    pub use super::endpoint_metric::Entity as EndpointMetric;
    pub use super::endpoint_metric::Model as EndpointMetricModel;

    pub use super::notification_channel::Entity as NotificationChannel;
    pub use super::notification_channel::Model as NotificationChannelModel;

    pub use super::user::Entity as User;
    pub use super::user::Model as UserModel;
}
