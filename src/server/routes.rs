//! Route handlers for the position hub.
//!
//! This module contains all the HTTP route handlers and related types for the Axum server.

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection, ws::WebSocketUpgrade},
    response::{Json, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::server::websocket::handle_websocket_connection;
use crate::store::{MemoryStore, RemoteStore, Snapshot};
use crate::sync::{Position, PositionTable, Region, UserId};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Shared application state
pub type AppState = Arc<MemoryStore>;

/// Body of `PUT /locations/:user_id`
#[derive(Serialize, Deserialize, Debug)]
pub struct PositionUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Basic health check endpoint
pub async fn health(State(store): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("Hub is running with {} stored positions", store.len()),
    })
}

/// Current snapshot of the whole collection
pub async fn list_locations(State(store): State<AppState>) -> Json<Snapshot> {
    Json(store.snapshot())
}

/// Overwrites one user's position
pub async fn put_location(
    State(store): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<PositionUpdate>, JsonRejection>,
) -> Result<Json<Snapshot>, AppError> {
    let Json(update) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;

    let position = Position::new(update.latitude, update.longitude);
    if !position.is_valid() {
        return Err(AppError::InvalidPosition);
    }

    let user = UserId::new(user_id);
    store.upsert(&user, position).await?;
    info!("Position updated over HTTP for {}", user);

    Ok(Json(store.snapshot()))
}

/// Region framing every valid stored position
pub async fn location_bounds(State(store): State<AppState>) -> Result<Json<Region>, AppError> {
    PositionTable::from_snapshot(&store.snapshot())
        .bounds()
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// WebSocket connection handler for live position sessions
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, state))
}

/// Creates and configures the main application router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/locations", get(list_locations))
        .route("/locations/bounds", get(location_bounds))
        .route("/locations/:user_id", put(put_location))
        .route("/ws", get(ws_handler))
}

/// Router with state attached, ready to serve
pub fn app(store: AppState) -> Router {
    create_router().with_state(store)
}
