use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::db::entities::notification_channel;
use crate::db::enums::ChannelType;
use crate::db::services::channel_service;
use crate::web::models::AuthenticatedUser;
use crate::web::models::endpoint_models::CreateChannelRequest;
use crate::web::{AppError, AppState};

pub fn create_channel_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_channels).post(create_channel))
        .route("/{id}", axum::routing::delete(delete_channel))
}

#[axum::debug_handler]
async fn list_channels(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<notification_channel::Model>>, AppError> {
    let channels = channel_service::channels_for_user(&state.db, user.id).await?;
    Ok(Json(channels))
}

#[axum::debug_handler]
async fn create_channel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateChannelRequest>,
) -> Result<(StatusCode, Json<notification_channel::Model>), AppError> {
    if payload.channel_type == ChannelType::Email
        && payload.target.parse::<lettre::message::Mailbox>().is_err()
    {
        return Err(AppError::InvalidInput(
            "Target must be a valid email address.".to_string(),
        ));
    }

    let channel = channel_service::create_channel(
        &state.db,
        user.id,
        payload.channel_type,
        payload.target,
        payload.is_default,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(channel)))
}

#[axum::debug_handler]
async fn delete_channel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let deleted = channel_service::delete_channel(&state.db, user.id, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Channel not found.".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
