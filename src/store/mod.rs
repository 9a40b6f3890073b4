//! Remote position store.
//!
//! The remote store is a document collection addressed by user id. It supports
//! two things: overwriting a user's document with a server-stamped position,
//! and a live subscription that delivers the whole collection on every change.

pub mod hub;
pub mod memory;
pub mod wire;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::sync::types::{Position, UserId};

pub use hub::HubStore;
pub use memory::MemoryStore;

/// One entry of the remote collection.
///
/// `data` is kept as raw JSON: other clients may have written anything there,
/// and readers decide per entry whether it is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Document {
            id: id.into(),
            data,
        }
    }
}

/// The complete collection at one instant, ordered by document id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>) -> Self {
        Snapshot { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id == id)
    }
}

/// Pluggable interface for the hosted document store.
///
/// Implementations must be `Send + Sync` so they can be shared as
/// `Arc<dyn RemoteStore>` between the sync actor and its publisher task.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Overwrites the user's document with `position`, stamped with the
    /// store's own clock.
    async fn upsert(&self, user: &UserId, position: Position) -> Result<(), StoreError>;

    /// Opens a live subscription over the whole collection.
    ///
    /// The first item is the current snapshot; every later change to any
    /// document yields a fresh full snapshot.
    fn subscribe(&self) -> BoxStream<'static, Result<Snapshot, StoreError>>;
}
