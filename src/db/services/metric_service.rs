//! Storage and retrieval of per-check metrics.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
};
use serde::Serialize;

use crate::db::entities::{endpoint_metric, prelude::*};
use crate::monitoring::probe::CheckResult;

pub async fn insert_metric(
    db: &DatabaseConnection,
    endpoint_id: i32,
    result: &CheckResult,
) -> Result<endpoint_metric::Model, DbErr> {
    let metric = endpoint_metric::ActiveModel {
        time: Set(Utc::now()),
        endpoint_id: Set(endpoint_id),
        response_time_ms: Set(result.response_time_ms),
        status_code: Set(result.status_code),
        status: Set(result.status),
        ..Default::default()
    };
    metric.insert(db).await
}

pub async fn recent_metrics(
    db: &DatabaseConnection,
    endpoint_id: i32,
    since: DateTime<Utc>,
    limit: u64,
) -> Result<Vec<endpoint_metric::Model>, DbErr> {
    EndpointMetric::find()
        .filter(endpoint_metric::Column::EndpointId.eq(endpoint_id))
        .filter(endpoint_metric::Column::Time.gte(since))
        .order_by_desc(endpoint_metric::Column::Time)
        .limit(limit)
        .all(db)
        .await
}

#[derive(Debug, FromQueryResult, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_checks: i64,
    pub up_checks: i64,
    pub down_checks: i64,
    pub timeout_checks: i64,
    pub avg_response_time_ms: Option<f64>,
    pub min_response_time_ms: Option<i32>,
    pub max_response_time_ms: Option<i32>,
}

/// Aggregates over the whole metric history of one endpoint. Latency
/// statistics only consider UP checks, matching how the dashboard reports
/// them.
pub async fn metrics_summary(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<MetricsSummary, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT
            COUNT(*) AS total_checks,
            COUNT(*) FILTER (WHERE status = 'UP') AS up_checks,
            COUNT(*) FILTER (WHERE status = 'DOWN') AS down_checks,
            COUNT(*) FILTER (WHERE status = 'TIMEOUT') AS timeout_checks,
            AVG(response_time_ms) FILTER (WHERE status = 'UP')::double precision AS avg_response_time_ms,
            MIN(response_time_ms) FILTER (WHERE status = 'UP') AS min_response_time_ms,
            MAX(response_time_ms) FILTER (WHERE status = 'UP') AS max_response_time_ms
        FROM endpoint_metrics
        WHERE endpoint_id = $1
        "#,
        [endpoint_id.into()],
    );

    MetricsSummary::find_by_statement(stmt)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("metrics summary for endpoint {endpoint_id}")))
}

pub fn range_start(range: &str) -> DateTime<Utc> {
    let hours = match range {
        "6h" => 6,
        "24h" => 24,
        _ => 1,
    };
    Utc::now() - Duration::hours(hours)
}
