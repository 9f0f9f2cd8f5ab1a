//! WebSocket streaming of fleet snapshots.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::extract_bearer;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    token: Option<String>,
}

/// Handler for WebSocket connections. Browser clients cannot set headers
/// on the upgrade request, so the operator token is also accepted as a
/// query parameter.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<WsQuery>,
) -> axum::response::Response {
    let provided = params.token.clone().or_else(|| extract_bearer(&headers));
    match provided.as_deref() {
        Some(token) if token == state.config().operator_token => {}
        Some(_) => return StatusCode::FORBIDDEN.into_response(),
        None => return StatusCode::UNAUTHORIZED.into_response(),
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(snapshot) => {
                        let payload = match serde_json::to_string(&snapshot) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!("Failed to serialize fleet snapshot: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        // Drop missed updates; a newer snapshot will arrive soon.
                        continue;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
