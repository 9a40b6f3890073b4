//! Type definitions for the location sync loop.
//!
//! This module contains the fundamental types used throughout the sync
//! implementation, organized into focused submodules.

pub mod permission;
pub mod position;
pub mod user_id;

pub use permission::{Authorization, PermissionAction, PermissionStatus};
pub use position::Position;
pub use user_id::UserId;
