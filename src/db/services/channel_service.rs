//! Notification channel rows. The monitoring core only reads these; writes
//! come from profile management and from registration (default channel).

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::db::entities::{notification_channel, prelude::*};
use crate::db::enums::ChannelType;

pub async fn channels_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<notification_channel::Model>, DbErr> {
    NotificationChannel::find()
        .filter(notification_channel::Column::UserId.eq(user_id))
        .all(db)
        .await
}

pub async fn create_channel(
    db: &DatabaseConnection,
    user_id: i32,
    channel_type: ChannelType,
    target: String,
    is_default: bool,
) -> Result<notification_channel::Model, DbErr> {
    let channel = notification_channel::ActiveModel {
        user_id: Set(user_id),
        channel_type: Set(channel_type),
        target: Set(target),
        is_default: Set(is_default),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    channel.insert(db).await
}

/// Registration seeds every account with an EMAIL channel pointing at the
/// registration address, so alerts work before the user configures anything.
pub async fn create_default_email_channel(
    db: &DatabaseConnection,
    user_id: i32,
    email: String,
) -> Result<notification_channel::Model, DbErr> {
    create_channel(db, user_id, ChannelType::Email, email, true).await
}

pub async fn delete_channel(
    db: &DatabaseConnection,
    user_id: i32,
    channel_id: i32,
) -> Result<u64, DbErr> {
    let res = NotificationChannel::delete_many()
        .filter(notification_channel::Column::Id.eq(channel_id))
        .filter(notification_channel::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
