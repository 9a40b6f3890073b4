//! In-process position collection.
//!
//! Backs the hub server and the test suites. Documents live in a concurrent
//! SkipMap so readers never block writers; a `watch` channel carries a change
//! counter that wakes every live subscription.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use crossbeam_skiplist::SkipMap;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::watch;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{Document, RemoteStore, Snapshot};
use crate::sync::types::{Position, UserId};

/// A document collection held in memory.
///
/// # Design
///
/// - One document per id; every write replaces the previous value
/// - Writes bump a change counter, subscribers rebuild the full snapshot
/// - Write rejection can be switched on to simulate an unavailable backend
pub struct MemoryStore {
    documents: Arc<SkipMap<String, serde_json::Value>>,
    version: watch::Sender<u64>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty collection.
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        MemoryStore {
            documents: Arc::new(SkipMap::new()),
            version,
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Stores raw document data, bypassing position validation.
    ///
    /// Other clients of a shared collection can write anything; this is how
    /// such entries get in.
    pub fn put_document(&self, id: impl Into<String>, data: serde_json::Value) {
        self.documents.insert(id.into(), data);
        self.notify();
    }

    /// Removes a document. Returns true if it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.documents.remove(id).is_some();
        if removed {
            self.notify();
        }
        removed
    }

    /// Raw data of one document.
    pub fn get(&self, id: &str) -> Option<serde_json::Value> {
        self.documents.get(id).map(|entry| entry.value().clone())
    }

    /// The whole collection, ordered by id.
    pub fn snapshot(&self) -> Snapshot {
        snapshot_of(&self.documents)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of changes applied so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Makes every following `upsert` fail until switched off again.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn notify(&self) {
        self.version.send_modify(|version| *version += 1);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn upsert(&self, user: &UserId, position: Position) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("store is rejecting writes".into()));
        }
        if !position.is_valid() {
            return Err(StoreError::WriteRejected(format!(
                "position out of range: ({}, {})",
                position.latitude, position.longitude
            )));
        }

        let data = serde_json::to_value(position.stamped(Utc::now()))?;
        self.put_document(user.as_str(), data);
        debug!("Stored position for {}", user);
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, Result<Snapshot, StoreError>> {
        let documents = Arc::clone(&self.documents);
        let mut changes = self.version.subscribe();
        // Deliver the current collection before waiting for changes
        changes.mark_changed();

        stream::unfold((documents, changes), |(documents, mut changes)| async move {
            changes.changed().await.ok()?;
            let snapshot = snapshot_of(&documents);
            Some((Ok(snapshot), (documents, changes)))
        })
        .boxed()
    }
}

fn snapshot_of(documents: &SkipMap<String, serde_json::Value>) -> Snapshot {
    Snapshot::new(
        documents
            .iter()
            .map(|entry| Document::new(entry.key().clone(), entry.value().clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_overwrites_and_stamps() {
        let store = MemoryStore::new();
        let user = UserId::new("u1");

        store.upsert(&user, Position::new(1.0, 1.0)).await.unwrap();
        store.upsert(&user, Position::new(2.0, 2.0)).await.unwrap();

        assert_eq!(store.len(), 1);
        let data = store.get("u1").unwrap();
        assert_eq!(data["latitude"], json!(2.0));
        assert_eq!(data["longitude"], json!(2.0));
        assert!(data["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_rejected_writes_leave_collection_untouched() {
        let store = MemoryStore::new();
        store.set_reject_writes(true);

        let result = store.upsert(&UserId::new("u1"), Position::new(1.0, 1.0)).await;
        assert!(matches!(result, Err(StoreError::WriteRejected(_))));
        assert!(store.is_empty());
        assert_eq!(store.version(), 0);

        let result = MemoryStore::new()
            .upsert(&UserId::new("u1"), Position::new(95.0, 1.0))
            .await;
        assert!(matches!(result, Err(StoreError::WriteRejected(_))));
    }

    #[tokio::test]
    async fn test_subscription_starts_with_current_snapshot() {
        let store = MemoryStore::new();
        store.put_document("a", json!({"latitude": 1.0, "longitude": 2.0}));

        let mut updates = store.subscribe();
        let first = updates.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert!(first.get("a").is_some());

        store.put_document("b", json!({}));
        let second = updates.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        let third = updates.next().await.unwrap().unwrap();
        assert_eq!(third.documents, vec![Document::new("b", json!({}))]);
    }

    #[test]
    fn test_snapshot_is_ordered_by_id() {
        let store = MemoryStore::new();
        store.put_document("zed", json!(1));
        store.put_document("amy", json!(2));
        store.put_document("kim", json!(3));

        let ids: Vec<_> = store
            .snapshot()
            .documents
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec!["amy", "kim", "zed"]);
    }
}
