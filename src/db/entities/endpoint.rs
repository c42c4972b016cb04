use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user-registered URL under periodic liveness checking.
///
/// `user_id` is nullable because deleting a user sets it to NULL rather than
/// cascading; the scheduler treats such rows as degraded and their ticks skip
/// alert dispatch.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoints")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Option<i32>,
    pub url: String,
    pub name: String,
    pub check_interval_sec: i32,
    pub is_active: bool,
    pub is_muted: bool,
    pub consecutive_fails: i32,
    pub alert_on_consecutive_fails: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull",
        on_update = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::endpoint_metric::Entity")]
    Metrics,

    #[sea_orm(has_many = "super::alert::Entity")]
    Alerts,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::endpoint_metric::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Metrics.def()
    }
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
