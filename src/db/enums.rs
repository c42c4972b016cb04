use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome classification of a single endpoint check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "check_status_enum")]
pub enum CheckStatus {
    #[sea_orm(string_value = "UP")]
    Up,
    #[sea_orm(string_value = "DOWN")]
    Down,
    #[sea_orm(string_value = "TIMEOUT")]
    Timeout,
}

impl CheckStatus {
    /// DOWN and TIMEOUT both count against the consecutive-failure counter.
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckStatus::Down | CheckStatus::Timeout)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Up => write!(f, "UP"),
            CheckStatus::Down => write!(f, "DOWN"),
            CheckStatus::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "alert_status_enum")]
pub enum AlertStatus {
    #[sea_orm(string_value = "TRIGGERED")]
    Triggered,
    #[sea_orm(string_value = "RESOLVED")]
    Resolved,
    // Reserved for manual acknowledgement; never produced by the alerting engine.
    #[sea_orm(string_value = "ACKNOWLEDGED")]
    Acknowledged,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Triggered => write!(f, "TRIGGERED"),
            AlertStatus::Resolved => write!(f, "RESOLVED"),
            AlertStatus::Acknowledged => write!(f, "ACKNOWLEDGED"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "channel_type_enum")]
pub enum ChannelType {
    #[sea_orm(string_value = "EMAIL")]
    Email,
    // Reserved; the dispatcher skips these until a sender exists.
    #[sea_orm(string_value = "WEBHOOK")]
    Webhook,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Email => write!(f, "EMAIL"),
            ChannelType::Webhook => write!(f, "WEBHOOK"),
        }
    }
}
