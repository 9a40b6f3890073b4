//! Error types for the sync loop, the remote stores and the hub server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures reported by a [`RemoteStore`](crate::store::RemoteStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("Connection to the store is closed")]
    Disconnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for StoreError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}

/// Conditions met by the sync loop.
///
/// None of these is fatal. Only `Closed` is ever returned to a caller; the
/// others are logged where they happen and the loop carries on.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Failed to publish position: {0}")]
    RemoteWriteFailed(#[source] StoreError),

    #[error("Skipped malformed position document '{document}'")]
    RemoteReadMalformed { document: String },

    #[error("No authenticated user, position not published")]
    Unauthenticated,

    #[error("Location sync has shut down")]
    Closed,
}

/// Errors returned by the hub's HTTP routes.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Position out of range")]
    InvalidPosition,

    #[error("No positions stored")]
    NotFound,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error_message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload(_) | AppError::InvalidPosition => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
