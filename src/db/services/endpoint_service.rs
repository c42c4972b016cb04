//! Queries for monitored endpoints, including the counter operations the
//! alerting engine relies on.

use futures::try_join;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, Statement,
};

use crate::db::entities::{endpoint, notification_channel, prelude::*, user};

/// An endpoint joined with its owner and the owner's notification channels,
/// as needed by one check cycle.
#[derive(Debug, Clone)]
pub struct EndpointForCheck {
    pub endpoint: endpoint::Model,
    pub owner: Option<user::Model>,
    pub channels: Vec<notification_channel::Model>,
}

/// Field-wise endpoint update; `None` leaves a column untouched.
#[derive(Debug, Default, Clone)]
pub struct EndpointUpdate {
    pub name: Option<String>,
    pub check_interval_sec: Option<i32>,
    pub alert_on_consecutive_fails: Option<i32>,
    pub is_muted: Option<bool>,
}

pub async fn create_endpoint(
    db: &DatabaseConnection,
    user_id: i32,
    url: String,
    name: String,
    check_interval_sec: i32,
    alert_on_consecutive_fails: i32,
) -> Result<endpoint::Model, DbErr> {
    let now = chrono::Utc::now();
    let new_endpoint = endpoint::ActiveModel {
        user_id: Set(Some(user_id)),
        url: Set(url),
        name: Set(name),
        check_interval_sec: Set(check_interval_sec),
        is_active: Set(true),
        is_muted: Set(false),
        consecutive_fails: Set(0),
        alert_on_consecutive_fails: Set(alert_on_consecutive_fails),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_endpoint.insert(db).await
}

pub async fn update_endpoint(
    db: &DatabaseConnection,
    endpoint: endpoint::Model,
    update: EndpointUpdate,
) -> Result<endpoint::Model, DbErr> {
    let mut active: endpoint::ActiveModel = endpoint.into();
    if let Some(name) = update.name {
        active.name = Set(name);
    }
    if let Some(interval) = update.check_interval_sec {
        active.check_interval_sec = Set(interval);
    }
    if let Some(threshold) = update.alert_on_consecutive_fails {
        active.alert_on_consecutive_fails = Set(threshold);
    }
    if let Some(muted) = update.is_muted {
        active.is_muted = Set(muted);
    }
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await
}

pub async fn delete_endpoint(db: &DatabaseConnection, endpoint_id: i32) -> Result<u64, DbErr> {
    let res = Endpoint::delete_by_id(endpoint_id).exec(db).await?;
    Ok(res.rows_affected)
}

pub async fn find_active_endpoints(
    db: &DatabaseConnection,
) -> Result<Vec<endpoint::Model>, DbErr> {
    Endpoint::find()
        .filter(endpoint::Column::IsActive.eq(true))
        .order_by_asc(endpoint::Column::Id)
        .all(db)
        .await
}

/// Fetches everything one tick needs in a single pass. Returns `None` when
/// the endpoint row is gone (deleted between scheduling and firing).
pub async fn find_endpoint_for_check(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<Option<EndpointForCheck>, DbErr> {
    let Some(ep) = Endpoint::find_by_id(endpoint_id).one(db).await? else {
        return Ok(None);
    };

    let (owner, channels) = match ep.user_id {
        Some(user_id) => {
            let owner_future = User::find_by_id(user_id).one(db);
            let channels_future = NotificationChannel::find()
                .filter(notification_channel::Column::UserId.eq(user_id))
                .all(db);
            try_join!(owner_future, channels_future)?
        }
        None => (None, Vec::new()),
    };

    Ok(Some(EndpointForCheck {
        endpoint: ep,
        owner,
        channels,
    }))
}

pub async fn find_endpoint_for_user(
    db: &DatabaseConnection,
    endpoint_id: i32,
    user_id: i32,
) -> Result<Option<endpoint::Model>, DbErr> {
    Endpoint::find_by_id(endpoint_id)
        .filter(endpoint::Column::UserId.eq(user_id))
        .one(db)
        .await
}

pub async fn list_endpoints_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<endpoint::Model>, DbErr> {
    Endpoint::find()
        .filter(endpoint::Column::UserId.eq(user_id))
        .order_by_desc(endpoint::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn set_endpoint_active(
    db: &DatabaseConnection,
    endpoint_id: i32,
    is_active: bool,
) -> Result<endpoint::Model, DbErr> {
    let ep = Endpoint::find_by_id(endpoint_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("endpoint {endpoint_id}")))?;
    let mut active: endpoint::ActiveModel = ep.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await
}

/// True when the endpoint still exists and is active. The alerting engine
/// re-checks this before writing alert rows, so an in-flight tick on a
/// just-paused endpoint records its metric but raises nothing.
pub async fn is_endpoint_active(db: &DatabaseConnection, endpoint_id: i32) -> Result<bool, DbErr> {
    Ok(Endpoint::find_by_id(endpoint_id)
        .one(db)
        .await?
        .map(|ep| ep.is_active)
        .unwrap_or(false))
}

/// Atomically bumps the consecutive-failure counter and returns the new
/// value. A single UPDATE .. RETURNING keeps concurrent ticks from losing
/// increments to read-modify-write races.
pub async fn increment_failure_counter(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<i32, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        UPDATE endpoints
        SET consecutive_fails = consecutive_fails + 1, updated_at = NOW()
        WHERE id = $1
        RETURNING consecutive_fails
        "#,
        [endpoint_id.into()],
    );
    let row = db
        .query_one(stmt)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("endpoint {endpoint_id}")))?;
    row.try_get("", "consecutive_fails")
}

pub async fn reset_failure_counter(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<(), DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"UPDATE endpoints SET consecutive_fails = 0, updated_at = NOW() WHERE id = $1"#,
        [endpoint_id.into()],
    );
    db.execute(stmt).await?;
    Ok(())
}
