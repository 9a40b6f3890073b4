//! WebSocket session management for the position hub.
//!
//! Each connected client receives the full collection on connect and again
//! after every change. Clients publish their own position with `upsert`
//! messages; the resulting change reaches every session, the sender included.

use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::server::routes::AppState;
use crate::store::RemoteStore;
use crate::store::wire::{ClientMessage, ServerMessage};
use crate::sync::{Position, UserId};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// WebSocket session manager
pub struct HubSession {
    socket: WebSocket,
    store: AppState,
    session_id: String,
}

impl HubSession {
    /// Create a new WebSocket session
    pub fn new(socket: WebSocket, store: AppState, session_id: String) -> Self {
        Self {
            socket,
            store,
            session_id,
        }
    }

    /// Handle the WebSocket connection lifecycle
    pub async fn handle(mut self) {
        info!("WebSocket session {} established", self.session_id);

        // First item is the current collection, so the client starts in sync
        let mut changes = self.store.subscribe();

        loop {
            tokio::select! {
                msg = self.socket.recv() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = self.handle_text_message(&text).await {
                            error!("Error handling message from {}: {}", self.session_id, e);
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket session {} closed by client", self.session_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = self.socket.send(Message::Pong(data)).await {
                            error!("Failed to send pong to {}: {}", self.session_id, e);
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Ignore other message types (binary, pong)
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", self.session_id, e);
                        break;
                    }
                },
                update = changes.next() => match update {
                    Some(Ok(snapshot)) => {
                        if let Err(e) = self.send_message(&ServerMessage::from(snapshot)).await {
                            error!("Failed to push snapshot to {}: {}", self.session_id, e);
                            break;
                        }
                    }
                    Some(Err(e)) => warn!("Change feed error for {}: {}", self.session_id, e),
                    None => break,
                },
            }
        }

        info!("WebSocket session {} ended", self.session_id);
    }

    /// Handle incoming text messages
    async fn handle_text_message(
        &mut self,
        text: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Upsert {
                user_id,
                latitude,
                longitude,
            }) => self.handle_upsert(user_id, Position::new(latitude, longitude)).await,
            Ok(ClientMessage::GetSnapshot) => {
                let snapshot = self.store.snapshot();
                self.send_message(&ServerMessage::from(snapshot)).await
            }
            Err(e) => {
                warn!("Failed to parse message from {}: {}", self.session_id, e);
                let reply = ServerMessage::Error {
                    message: AppError::MalformedPayload(e.to_string()).to_string(),
                };
                self.send_message(&reply).await
            }
        }
    }

    /// Store a client's position; the change feed takes care of the reply
    async fn handle_upsert(
        &mut self,
        user_id: String,
        position: Position,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !position.is_valid() {
            warn!(
                "Session {} sent an out of range position for {}",
                self.session_id, user_id
            );
            let reply = ServerMessage::Error {
                message: AppError::InvalidPosition.to_string(),
            };
            return self.send_message(&reply).await;
        }

        let user = UserId::new(user_id);
        if let Err(e) = self.store.upsert(&user, position).await {
            error!("Failed to store position for {}: {}", user, e);
            let reply = ServerMessage::Error {
                message: AppError::Store(e).to_string(),
            };
            return self.send_message(&reply).await;
        }

        Ok(())
    }

    /// Send a message to the client
    async fn send_message(
        &mut self,
        message: &ServerMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let json = serde_json::to_string(message)?;
        self.socket.send(Message::Text(json)).await?;
        Ok(())
    }
}

/// Generate a unique session ID
pub fn generate_session_id() -> String {
    format!("session_{}", NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
}

/// Create and handle a new WebSocket session
pub async fn handle_websocket_connection(socket: WebSocket, store: AppState) {
    let session_id = generate_session_id();
    let session = HubSession::new(socket, store, session_id);
    session.handle().await;
}
