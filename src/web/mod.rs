use axum::{
    Json, Router,
    extract::State,
    http::Method,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::monitoring::{CheckScheduler, MonitorTickRunner};
use crate::notifications::NotificationDispatcher;
use crate::realtime::EventHub;
use crate::services::auth_service;
use crate::web::{
    error::AppError,
    middleware::auth,
    models::{LoginRequest, RegisterRequest},
    routes::{alert_routes, channel_routes, endpoint_routes},
};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod ws_handler;

pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub scheduler: Arc<CheckScheduler<MonitorTickRunner>>,
    pub runner: Arc<MonitorTickRunner>,
    pub hub: Arc<EventHub>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

fn auth_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(("token", token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build()
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth_response =
        auth_service::register_user(&state.db, payload, &state.config.jwt_secret).await?;

    let cookie = auth_cookie(&auth_response.token);
    let mut response = (axum::http::StatusCode::CREATED, Json(auth_response)).into_response();
    if let Ok(value) = cookie.to_string().parse() {
        response
            .headers_mut()
            .insert(axum::http::header::SET_COOKIE, value);
    }
    Ok(response)
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth_response =
        auth_service::login_user(&state.db, payload, &state.config.jwt_secret).await?;

    let cookie = auth_cookie(&auth_response.token);
    let mut response = Json(auth_response).into_response();
    if let Ok(value) = cookie.to_string().parse() {
        response
            .headers_mut()
            .insert(axum::http::header::SET_COOKIE, value);
    }
    Ok(response)
}

async fn logout_handler() -> impl IntoResponse {
    let cookie = Cookie::build(("token", ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    let mut response =
        Json(serde_json::json!({ "message": "Logout successful" })).into_response();
    if let Ok(value) = cookie.to_string().parse() {
        response
            .headers_mut()
            .insert(axum::http::header::SET_COOKIE, value);
    }
    response
}

async fn health_check_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .db
        .ping()
        .await
        .map_err(|e| AppError::InternalServerError(format!("Database unreachable: {e}")))?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "scheduledChecks": state.scheduler.entry_count().await,
        "connectedUsers": state.hub.user_count(),
    })))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let methods = vec![
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    // Credentialed CORS cannot use wildcards, so a configured origin gets an
    // explicit header list.
    let cors = match app_state
        .config
        .cors_origin
        .as_ref()
        .and_then(|origin| origin.parse::<axum::http::HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(methods)
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    };

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route(
            "/api/auth/me",
            get(auth_service::me).route_layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth::auth,
            )),
        )
        .route("/ws", get(ws_handler::websocket_handler))
        .nest(
            "/api/endpoints",
            endpoint_routes::create_endpoint_router().route_layer(
                axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
            ),
        )
        .nest(
            "/api/alerts",
            alert_routes::create_alert_router().route_layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth::auth,
            )),
        )
        .nest(
            "/api/channels",
            channel_routes::create_channel_router().route_layer(
                axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
            ),
        )
        .with_state(app_state)
        .layer(cors)
}
