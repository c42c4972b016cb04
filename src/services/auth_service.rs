use axum::Extension;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::db::entities::user;
use crate::db::services::{channel_service, user_service};
use crate::web::error::AppError;
use crate::web::models::{AuthResponse, AuthenticatedUser, Claims, LoginRequest, RegisterRequest, UserResponse};

pub async fn register_user(
    db: &DatabaseConnection,
    req: RegisterRequest,
    jwt_secret: &str,
) -> Result<AuthResponse, AppError> {
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required.".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters.".to_string(),
        ));
    }

    if user_service::find_user_by_email(db, &req.email).await?.is_some() {
        return Err(AppError::UserAlreadyExists(
            "A user with this email already exists.".to_string(),
        ));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let name = req.name.unwrap_or_else(|| "Unnamed User".to_string());
    let new_user = user_service::create_user(db, req.email, name, password_hash).await?;

    // Every account starts with an EMAIL channel pointing at the
    // registration address so alerts can be delivered immediately.
    channel_service::create_default_email_channel(db, new_user.id, new_user.email.clone()).await?;

    info!(user_id = new_user.id, "Registered new user.");
    create_jwt_for_user(&new_user, jwt_secret)
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<AuthResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required.".to_string(),
        ));
    }

    let user = user_service::find_user_by_email(db, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification error: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(user: &user::Model, jwt_secret: &str) -> Result<AuthResponse, AppError> {
    let expiration = (Utc::now() + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(AuthResponse {
        token,
        user: UserResponse {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        },
    })
}

pub async fn me(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    Ok(axum::Json(serde_json::json!({
        "id": user.id,
        "email": user.email,
    })))
}
