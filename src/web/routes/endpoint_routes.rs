//! Endpoint CRUD plus the schedule mutations that must stay in lock-step
//! with the persisted `is_active` flag. Every handler that changes
//! scheduling either completes the schedule mutation or fails the request,
//! rolling back the flag where it would otherwise lie.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::db::entities::endpoint;
use crate::db::services::{alert_service, endpoint_service, metric_service};
use crate::db::services::endpoint_service::EndpointUpdate;
use crate::web::models::endpoint_models::{
    CreateEndpointRequest, ManualCheckResponse, MetricsQuery, UpdateEndpointRequest,
    clamp_interval, clamp_threshold, is_valid_url,
};
use crate::realtime::{EndpointStatePayload, WsMessage};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

pub fn create_endpoint_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_endpoints).post(create_endpoint))
        .route(
            "/{id}",
            get(get_endpoint).put(update_endpoint).delete(delete_endpoint),
        )
        .route("/{id}/pause", post(pause_endpoint))
        .route("/{id}/resume", post(resume_endpoint))
        .route("/{id}/check", post(manual_check))
        .route("/{id}/metrics", get(get_metrics))
        .route("/{id}/metrics/summary", get(get_metrics_summary))
        .route("/{id}/alerts", get(get_endpoint_alerts))
}

async fn publish_state_change(state: &AppState, owner_id: i32, ep: &endpoint::Model) {
    let has_open_alert = alert_service::find_open_alert(&state.db, ep.id)
        .await
        .ok()
        .flatten()
        .is_some();
    state.hub.publish(
        owner_id,
        WsMessage::EndpointStateChanged(EndpointStatePayload {
            endpoint_id: ep.id,
            is_active: ep.is_active,
            consecutive_fails: ep.consecutive_fails,
            has_open_alert,
        }),
    );
}

async fn owned_endpoint(
    state: &AppState,
    user: &AuthenticatedUser,
    endpoint_id: i32,
) -> Result<endpoint::Model, AppError> {
    endpoint_service::find_endpoint_for_user(&state.db, endpoint_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Endpoint not found or access denied.".to_string()))
}

#[axum::debug_handler]
async fn list_endpoints(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<endpoint::Model>>, AppError> {
    let endpoints = endpoint_service::list_endpoints_for_user(&state.db, user.id).await?;
    Ok(Json(endpoints))
}

#[axum::debug_handler]
async fn create_endpoint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateEndpointRequest>,
) -> Result<(StatusCode, Json<endpoint::Model>), AppError> {
    if payload.url.is_empty() {
        return Err(AppError::InvalidInput("URL is required.".to_string()));
    }
    if !is_valid_url(&payload.url) {
        return Err(AppError::InvalidInput("Invalid URL format.".to_string()));
    }

    let interval = clamp_interval(payload.check_interval_sec);
    let threshold = clamp_threshold(payload.alert_on_consecutive_fails);
    let name = payload.name.clone().unwrap_or_else(|| payload.url.clone());

    let created = endpoint_service::create_endpoint(
        &state.db,
        user.id,
        payload.url,
        name,
        interval,
        threshold,
    )
    .await
    .map_err(|e| {
        if e.to_string().contains("duplicate key") {
            AppError::Conflict("This URL is already monitored for this user.".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    // An active endpoint without a schedule would lie about being
    // monitored, so a failed schedule undoes the insert.
    if let Err(e) = state.scheduler.schedule(created.id, created.check_interval_sec).await {
        error!(endpoint_id = created.id, error = %e, "Failed to schedule new endpoint; rolling back.");
        if let Err(del) = endpoint_service::delete_endpoint(&state.db, created.id).await {
            error!(endpoint_id = created.id, error = %del, "Rollback delete failed.");
        }
        return Err(e.into());
    }

    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
async fn get_endpoint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<endpoint::Model>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;
    Ok(Json(ep))
}

#[axum::debug_handler]
async fn update_endpoint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEndpointRequest>,
) -> Result<Json<endpoint::Model>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    let interval_changed = payload
        .check_interval_sec
        .map(|requested| clamp_interval(Some(requested)) != ep.check_interval_sec)
        .unwrap_or(false);

    let update = EndpointUpdate {
        name: payload.name,
        check_interval_sec: payload.check_interval_sec.map(|v| clamp_interval(Some(v))),
        alert_on_consecutive_fails: payload
            .alert_on_consecutive_fails
            .map(|v| clamp_threshold(Some(v))),
        is_muted: payload.is_muted,
    };
    let updated = endpoint_service::update_endpoint(&state.db, ep, update).await?;

    if interval_changed {
        state.scheduler.reschedule_if_active(&updated).await?;
    }

    Ok(Json(updated))
}

#[axum::debug_handler]
async fn delete_endpoint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    state.scheduler.unschedule(ep.id).await;
    endpoint_service::delete_endpoint(&state.db, ep.id).await?;

    Ok(Json(serde_json::json!({ "message": "Endpoint deleted successfully" })))
}

#[axum::debug_handler]
async fn pause_endpoint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<endpoint::Model>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    state.scheduler.unschedule(ep.id).await;
    let updated = endpoint_service::set_endpoint_active(&state.db, ep.id, false).await?;

    publish_state_change(&state, user.id, &updated).await;
    Ok(Json(updated))
}

#[axum::debug_handler]
async fn resume_endpoint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<endpoint::Model>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    let updated = endpoint_service::set_endpoint_active(&state.db, ep.id, true).await?;

    if let Err(e) = state
        .scheduler
        .schedule(updated.id, updated.check_interval_sec)
        .await
    {
        // Revert so `is_active` never claims a schedule that does not exist.
        warn!(endpoint_id = updated.id, error = %e, "Failed to resume monitoring; reverting to inactive.");
        endpoint_service::set_endpoint_active(&state.db, updated.id, false).await?;
        return Err(e.into());
    }

    publish_state_change(&state, user.id, &updated).await;
    Ok(Json(updated))
}

#[axum::debug_handler]
async fn manual_check(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ManualCheckResponse>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    let (result, metric) = state.runner.run_manual_check(&ep).await?;
    Ok(Json(ManualCheckResponse {
        status: result.status,
        response_time_ms: result.response_time_ms,
        status_code: result.status_code,
        error_detail: result.error_detail,
        metric,
    }))
}

#[axum::debug_handler]
async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<Vec<crate::db::entities::endpoint_metric::Model>>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    let since = metric_service::range_start(query.range.as_deref().unwrap_or("1h"));
    let limit = query.limit.unwrap_or(100).clamp(1, 100);
    let metrics = metric_service::recent_metrics(&state.db, ep.id, since, limit).await?;
    Ok(Json(metrics))
}

#[axum::debug_handler]
async fn get_metrics_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<metric_service::MetricsSummary>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    let summary = metric_service::metrics_summary(&state.db, ep.id).await?;
    Ok(Json(summary))
}

#[axum::debug_handler]
async fn get_endpoint_alerts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<crate::db::entities::alert::Model>>, AppError> {
    let ep = owned_endpoint(&state, &user, id).await?;

    let alerts = alert_service::list_alerts_for_endpoint(&state.db, ep.id).await?;
    Ok(Json(alerts))
}
