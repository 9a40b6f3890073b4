//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use parking_lot::Mutex;
use serde_json::json;
use survale_sync::{
    Authorization, Document, LocationSync, MemoryStore, Position, RemoteStore, SharedSession,
    SimulatedLocator, Snapshot, StoreError, SyncState, UserId,
};
use tokio::sync::Notify;

pub const WAIT: Duration = Duration::from_secs(5);

/// A sync loop over an in-memory store and a simulated locator.
pub struct Harness {
    pub sync: LocationSync,
    pub locator: Arc<SimulatedLocator>,
    pub store: Arc<MemoryStore>,
    pub session: SharedSession,
}

pub fn harness(authorization: Authorization, session: SharedSession) -> Harness {
    let locator = Arc::new(SimulatedLocator::new(authorization));
    let store = Arc::new(MemoryStore::new());
    let sync = LocationSync::new(
        locator.clone(),
        store.clone(),
        Arc::new(session.clone()),
    );
    Harness {
        sync,
        locator,
        store,
        session,
    }
}

/// Waits until the published state satisfies `predicate`.
pub async fn wait_for_state(
    sync: &LocationSync,
    predicate: impl FnMut(&SyncState) -> bool,
) -> SyncState {
    let mut states = sync.subscribe();
    let state = tokio::time::timeout(WAIT, states.wait_for(predicate))
        .await
        .expect("timed out waiting for sync state")
        .expect("sync loop stopped")
        .clone();
    state
}

pub fn position_doc(id: &str, latitude: f64, longitude: f64) -> Document {
    Document::new(id, json!({"latitude": latitude, "longitude": longitude}))
}

/// Store whose subscription replays a fixed script, then parks.
///
/// `parked` is notified when the subscriber asks for the item after the
/// script, i.e. once every scripted item has been handed over.
pub struct ScriptedStore {
    script: Mutex<Vec<Result<Snapshot, StoreError>>>,
    pub writes: Mutex<Vec<(UserId, Position)>>,
    pub subscriptions: Mutex<usize>,
    pub parked: Arc<Notify>,
}

impl ScriptedStore {
    pub fn new(script: Vec<Result<Snapshot, StoreError>>) -> Self {
        ScriptedStore {
            script: Mutex::new(script),
            writes: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(0),
            parked: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn upsert(&self, user: &UserId, position: Position) -> Result<(), StoreError> {
        self.writes.lock().push((user.clone(), position));
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, Result<Snapshot, StoreError>> {
        *self.subscriptions.lock() += 1;
        let script = std::mem::take(&mut *self.script.lock());
        let parked = Arc::clone(&self.parked);

        stream::iter(script)
            .chain(stream::once(async move {
                parked.notify_one();
                std::future::pending::<Result<Snapshot, StoreError>>().await
            }))
            .boxed()
    }
}
