//! Access to the authenticated identity.
//!
//! The sync loop receives its session at construction instead of reaching for
//! a process-wide "current user".

use std::sync::Arc;

use parking_lot::RwLock;

use crate::sync::types::UserId;

/// Supplies the currently authenticated user, if any.
pub trait Session: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// A session whose user can be swapped at runtime by the sign-in flow.
///
/// Clones share the same underlying slot.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    user: Arc<RwLock<Option<UserId>>>,
}

impl SharedSession {
    /// Creates a signed-out session
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session already signed in as `user`
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        let session = Self::new();
        session.sign_in(user);
        session
    }

    pub fn sign_in(&self, user: impl Into<UserId>) {
        *self.user.write() = Some(user.into());
    }

    pub fn sign_out(&self) {
        *self.user.write() = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.read().is_some()
    }
}

impl Session for SharedSession {
    fn current_user(&self) -> Option<UserId> {
        self.user.read().clone()
    }
}
