//! Device location service seam.
//!
//! A [`DeviceLocator`] is driven by the sync loop (start, stop, ask for
//! permission). It reports back through a [`SyncHandle`](crate::sync::SyncHandle),
//! whose methods may be called from any thread.

use parking_lot::Mutex;

use crate::sync::types::Authorization;

/// Commands the sync loop sends to the platform location service.
///
/// Implementations must not block: each call only forwards a request to the
/// platform, and results come back later as handle callbacks.
pub trait DeviceLocator: Send + Sync {
    /// Authorization as currently known to the platform.
    fn authorization(&self) -> Authorization;

    /// Prompts the user for "when in use" permission.
    fn request_authorization(&self);

    /// Begins (or resumes) continuous position updates.
    fn start_updating(&self);

    /// Stops position updates.
    fn stop_updating(&self);
}

/// A call received by a [`SimulatedLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorCall {
    RequestAuthorization,
    StartUpdating,
    StopUpdating,
}

/// Locator without hardware, for tests and demos.
///
/// Records every call it receives. The reported authorization is set by the
/// caller; simulated fixes are delivered through the sync handle.
#[derive(Debug)]
pub struct SimulatedLocator {
    authorization: Mutex<Authorization>,
    calls: Mutex<Vec<LocatorCall>>,
}

impl SimulatedLocator {
    pub fn new(authorization: Authorization) -> Self {
        SimulatedLocator {
            authorization: Mutex::new(authorization),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_authorization(&self, authorization: Authorization) {
        *self.authorization.lock() = authorization;
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> Vec<LocatorCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<LocatorCall> {
        self.calls.lock().last().copied()
    }

    /// True if the most recent start/stop call was a start.
    pub fn is_updating(&self) -> bool {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|call| **call != LocatorCall::RequestAuthorization)
            == Some(&LocatorCall::StartUpdating)
    }

    fn record(&self, call: LocatorCall) {
        self.calls.lock().push(call);
    }
}

impl DeviceLocator for SimulatedLocator {
    fn authorization(&self) -> Authorization {
        *self.authorization.lock()
    }

    fn request_authorization(&self) {
        self.record(LocatorCall::RequestAuthorization);
    }

    fn start_updating(&self) {
        self.record(LocatorCall::StartUpdating);
    }

    fn stop_updating(&self) {
        self.record(LocatorCall::StopUpdating);
    }
}
