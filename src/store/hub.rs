//! Websocket client for the hub server.
//!
//! One connection carries both directions: writes are queued to a writer task,
//! and every snapshot the hub pushes is fanned out to all local subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::store::wire::{ClientMessage, ServerMessage};
use crate::store::{RemoteStore, Snapshot};
use crate::sync::types::{Position, UserId};

/// Snapshots kept for slow subscribers before they start skipping.
/// Skipping is harmless: every snapshot supersedes the previous one.
const SNAPSHOT_BUFFER: usize = 16;

/// A [`RemoteStore`] backed by a hub reachable over websocket.
pub struct HubStore {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    snapshots: broadcast::Sender<Result<Snapshot, StoreError>>,
    /// Set by the reader before it announces the disconnect
    closed: Arc<AtomicBool>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl HubStore {
    /// Connects to a hub websocket endpoint such as `ws://127.0.0.1:3000/ws`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (socket, _response) = connect_async(url).await?;
        info!("Connected to hub at {}", url);

        let (mut sink, mut source) = socket.split();
        let (outbound, mut queued) = mpsc::unbounded_channel::<ClientMessage>();
        let (snapshots, _) = broadcast::channel(SNAPSHOT_BUFFER);

        let writer = tokio::spawn(async move {
            while let Some(message) = queued.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode hub message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!("Hub connection lost while sending: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let fanout = snapshots.clone();
        let closed = Arc::new(AtomicBool::new(false));
        let reader_closed = Arc::clone(&closed);
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(ServerMessage::Snapshot { documents }) => {
                            // No subscribers is fine, the snapshot is simply dropped
                            let _ = fanout.send(Ok(Snapshot::new(documents)));
                        }
                        Ok(ServerMessage::Error { message }) => {
                            warn!("Hub reported an error: {}", message);
                        }
                        Err(e) => warn!("Ignoring malformed hub message: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        info!("Hub closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Hub connection error: {}", e);
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
            let _ = fanout.send(Err(StoreError::Disconnected));
        });

        Ok(HubStore {
            outbound,
            snapshots,
            closed,
            writer,
            reader,
        })
    }

    /// True while both sides of the connection are still running.
    pub fn is_connected(&self) -> bool {
        !self.outbound.is_closed() && !self.closed.load(Ordering::SeqCst)
    }

    fn send(&self, message: ClientMessage) -> Result<(), StoreError> {
        self.outbound
            .send(message)
            .map_err(|_| StoreError::Disconnected)
    }
}

impl Drop for HubStore {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
    }
}

#[async_trait]
impl RemoteStore for HubStore {
    async fn upsert(&self, user: &UserId, position: Position) -> Result<(), StoreError> {
        if !position.is_valid() {
            return Err(StoreError::WriteRejected(format!(
                "position out of range: ({}, {})",
                position.latitude, position.longitude
            )));
        }
        self.send(ClientMessage::Upsert {
            user_id: user.to_string(),
            latitude: position.latitude,
            longitude: position.longitude,
        })
    }

    fn subscribe(&self) -> BoxStream<'static, Result<Snapshot, StoreError>> {
        let receiver = self.snapshots.subscribe();

        // Checked after subscribing: a disconnect announced later still
        // reaches `receiver`, one announced earlier is reported here.
        if self.closed.load(Ordering::SeqCst) {
            return stream::once(async { Err(StoreError::Disconnected) }).boxed();
        }

        // The hub only pushes on change; ask for the current collection so
        // this subscriber does not start empty.
        if let Err(e) = self.send(ClientMessage::GetSnapshot) {
            return stream::once(async move { Err(e) }).boxed();
        }

        stream::unfold(Some(receiver), |receiver| async move {
            let mut receiver = receiver?;
            loop {
                match receiver.recv().await {
                    Ok(Err(StoreError::Disconnected)) => {
                        return Some((Err(StoreError::Disconnected), None));
                    }
                    Ok(item) => return Some((item, Some(receiver))),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Subscriber skipped {} stale snapshots", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
