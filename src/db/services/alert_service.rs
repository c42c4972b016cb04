//! Alert rows and their lifecycle transitions.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};

use crate::db::entities::{alert, endpoint, prelude::*};
use crate::db::enums::AlertStatus;

/// The single open (TRIGGERED) alert for an endpoint, if any.
pub async fn find_open_alert(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<Option<alert::Model>, DbErr> {
    Alert::find()
        .filter(alert::Column::EndpointId.eq(endpoint_id))
        .filter(alert::Column::Status.eq(AlertStatus::Triggered))
        .one(db)
        .await
}

pub async fn create_alert(
    db: &DatabaseConnection,
    endpoint_id: i32,
    message: String,
) -> Result<alert::Model, DbErr> {
    let new_alert = alert::ActiveModel {
        endpoint_id: Set(endpoint_id),
        status: Set(AlertStatus::Triggered),
        message: Set(message),
        created_at: Set(Utc::now()),
        resolved_at: Set(None),
        ..Default::default()
    };
    new_alert.insert(db).await
}

pub async fn resolve_alert(
    db: &DatabaseConnection,
    alert_id: i32,
) -> Result<alert::Model, DbErr> {
    let open = Alert::find_by_id(alert_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("alert {alert_id}")))?;
    let mut active: alert::ActiveModel = open.into();
    active.status = Set(AlertStatus::Resolved);
    active.resolved_at = Set(Some(Utc::now()));
    active.update(db).await
}

pub async fn list_alerts_for_endpoint(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<Vec<alert::Model>, DbErr> {
    Alert::find()
        .filter(alert::Column::EndpointId.eq(endpoint_id))
        .order_by_desc(alert::Column::CreatedAt)
        .all(db)
        .await
}

/// All alerts across a user's endpoints, newest first.
pub async fn list_alerts_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<alert::Model>, DbErr> {
    Alert::find()
        .join(JoinType::InnerJoin, alert::Relation::Endpoint.def())
        .filter(endpoint::Column::UserId.eq(user_id))
        .order_by_desc(alert::Column::CreatedAt)
        .all(db)
        .await
}
