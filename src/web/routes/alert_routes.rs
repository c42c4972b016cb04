use axum::{Extension, Json, Router, extract::State, routing::get};
use std::sync::Arc;

use crate::db::entities::alert;
use crate::db::services::alert_service;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

pub fn create_alert_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_alerts))
}

#[axum::debug_handler]
async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<alert::Model>>, AppError> {
    let alerts = alert_service::list_alerts_for_user(&state.db, user.id).await?;
    Ok(Json(alerts))
}
