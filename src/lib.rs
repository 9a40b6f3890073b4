//! # Survale Sync - shared live locations
//!
//! The location synchronization loop of a location-sharing client: device
//! fixes are published to a shared collection keyed by user, and that
//! collection is mirrored back as an in-memory table for the map.
//!
//! ## Features
//!
//! - **Single-context state**: every mutation runs on one actor task; readers use a `watch` channel
//! - **Fire-and-forget writes**: failed writes are logged and superseded by the next fix
//! - **Full-snapshot mirror**: each change notification rebuilds the table, skipping malformed entries
//! - **Pluggable seams**: device locator, remote store and identity session are traits
//! - **Hub server**: an Axum stand-in for the hosted store, over HTTP and WebSocket
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use survale_sync::{
//!     Authorization, LocationSync, MemoryStore, Position, SharedSession, SimulatedLocator,
//! };
//!
//! # async fn demo() {
//! let locator = Arc::new(SimulatedLocator::new(Authorization::AuthorizedWhenInUse));
//! let store = Arc::new(MemoryStore::new());
//! let session = Arc::new(SharedSession::signed_in("u1"));
//!
//! let sync = LocationSync::new(locator, store, session);
//! sync.start();
//! sync.subscribe_to_remote_positions();
//! sync.handle().on_position_update(Position::new(37.0, -122.0));
//! # }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod sync;

// Re-export the main public API
pub use config::Config;
pub use error::{AppError, StoreError, SyncError};
pub use store::{Document, HubStore, MemoryStore, RemoteStore, Snapshot};
pub use sync::{
    Authorization, DeviceLocator, LocationSync, PermissionStatus, Position, PositionTable, Region,
    Session, SharedSession, SimulatedLocator, SyncHandle, SyncState, UserId,
};
