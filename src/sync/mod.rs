//! Location synchronization module.
//!
//! This module contains the sync loop and everything it is built from: the
//! core types, the mirrored position table, map regions, and the seams to the
//! device locator and the identity session.

pub mod device;
pub mod location_sync;
pub mod region;
pub mod session;
pub mod table;
pub mod types;

// Re-export the main public API
pub use device::{DeviceLocator, LocatorCall, SimulatedLocator};
pub use location_sync::{LocationSync, SyncHandle, SyncState};
pub use region::Region;
pub use session::{Session, SharedSession};
pub use table::PositionTable;
pub use types::{Authorization, PermissionAction, PermissionStatus, Position, UserId};
