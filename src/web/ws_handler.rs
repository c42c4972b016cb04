//! The realtime gateway's transport edge: authenticates a WebSocket
//! connection, subscribes it to the owner's event channel and forwards
//! envelopes as JSON text frames until either side hangs up.

use axum::{
    extract::{
        Query, State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::stream::StreamExt;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::web::models::{AuthenticatedUser, Claims};
use crate::web::{AppError, AppState};

#[derive(Deserialize, Debug)]
pub struct WebSocketAuthQuery {
    token: Option<String>,
}

fn authenticate_ws_connection(
    jwt_secret: &str,
    token_option: Option<String>,
) -> Result<AuthenticatedUser, AppError> {
    let token = token_option
        .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "WebSocket authentication failed.");
        AppError::Unauthorized("Invalid token".to_string())
    })?;

    Ok(AuthenticatedUser {
        id: token_data.claims.user_id,
        email: token_data.claims.sub,
    })
}

#[axum::debug_handler]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WebSocketAuthQuery>,
) -> impl IntoResponse {
    let user = match authenticate_ws_connection(&state.config.jwt_secret, query.token) {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, user: AuthenticatedUser) {
    info!(user_id = user.id, "WebSocket connection established.");

    let mut rx = state.hub.subscribe(user.id);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let json = match serde_json::to_string(&*event) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(user_id = user.id, error = %e, "Failed to serialize event.");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(Utf8Bytes::from(json))).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Slow consumer; missed events are queryable via the
                        // metrics and alerts API.
                        debug!(user_id = user.id, skipped, "WebSocket client lagged.");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        if text == "ping"
                            && socket.send(Message::Text(Utf8Bytes::from("pong"))).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(user_id = user.id, error = %e, "WebSocket receive error.");
                        break;
                    }
                }
            }
        }
    }

    drop(rx);
    state.hub.disconnect(user.id);
    info!(user_id = user.id, "WebSocket connection closed.");
}
