//! Location permission lifecycle.
//!
//! The operating system reports a fine-grained [`Authorization`]; the sync
//! loop only cares about the coarse [`PermissionStatus`] and what to do next.
//!
//! # Transitions
//!
//! ```text
//! Undetermined ──▶ Granted ◀──▶ Denied
//!       └───────────────────────▲
//! ```
//!
//! Once a decision has been made, `Undetermined` is never re-entered: a later
//! "not determined" report only triggers a new permission request.

use serde::{Deserialize, Serialize};

/// Authorization as reported by the device's location service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl Authorization {
    pub fn is_granted(self) -> bool {
        matches!(
            self,
            Authorization::AuthorizedWhenInUse | Authorization::AuthorizedAlways
        )
    }
}

/// Coarse permission state kept in the observable sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    #[default]
    Undetermined,
    Granted,
    Denied,
}

/// What the sync loop must ask of the locator after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAction {
    StartUpdates,
    StopUpdates,
    RequestAuthorization,
}

impl PermissionStatus {
    /// Applies an authorization report and returns the next status together
    /// with the action the locator must perform.
    pub fn apply(self, reported: Authorization) -> (PermissionStatus, PermissionAction) {
        match reported {
            Authorization::AuthorizedWhenInUse | Authorization::AuthorizedAlways => {
                (PermissionStatus::Granted, PermissionAction::StartUpdates)
            }
            Authorization::Denied | Authorization::Restricted => {
                (PermissionStatus::Denied, PermissionAction::StopUpdates)
            }
            // A decided status is kept; the user is simply asked again.
            Authorization::NotDetermined => (self, PermissionAction::RequestAuthorization),
        }
    }

    pub fn is_denied(self) -> bool {
        self == PermissionStatus::Denied
    }

    pub fn is_decided(self) -> bool {
        self != PermissionStatus::Undetermined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REPORTS: [Authorization; 5] = [
        Authorization::NotDetermined,
        Authorization::Restricted,
        Authorization::Denied,
        Authorization::AuthorizedWhenInUse,
        Authorization::AuthorizedAlways,
    ];

    #[test]
    fn test_undetermined_reaches_both_decisions() {
        let (granted, action) =
            PermissionStatus::Undetermined.apply(Authorization::AuthorizedAlways);
        assert_eq!(granted, PermissionStatus::Granted);
        assert_eq!(action, PermissionAction::StartUpdates);

        let (denied, action) = PermissionStatus::Undetermined.apply(Authorization::Restricted);
        assert_eq!(denied, PermissionStatus::Denied);
        assert_eq!(action, PermissionAction::StopUpdates);
    }

    #[test]
    fn test_granted_and_denied_reach_each_other() {
        let (status, _) = PermissionStatus::Granted.apply(Authorization::Denied);
        assert_eq!(status, PermissionStatus::Denied);

        let (status, _) = PermissionStatus::Denied.apply(Authorization::AuthorizedWhenInUse);
        assert_eq!(status, PermissionStatus::Granted);
    }

    #[test]
    fn test_undetermined_never_reentered() {
        for start in [PermissionStatus::Granted, PermissionStatus::Denied] {
            for report in ALL_REPORTS {
                let (next, _) = start.apply(report);
                assert!(next.is_decided(), "{start:?} + {report:?} went back to undetermined");
            }
        }
    }

    #[test]
    fn test_not_determined_requests_again() {
        let (status, action) = PermissionStatus::Undetermined.apply(Authorization::NotDetermined);
        assert_eq!(status, PermissionStatus::Undetermined);
        assert_eq!(action, PermissionAction::RequestAuthorization);

        let (status, action) = PermissionStatus::Denied.apply(Authorization::NotDetermined);
        assert_eq!(status, PermissionStatus::Denied);
        assert_eq!(action, PermissionAction::RequestAuthorization);
    }

    #[test]
    fn test_authorization_is_granted() {
        let granted: Vec<_> = ALL_REPORTS.into_iter().filter(|a| a.is_granted()).collect();
        assert_eq!(
            granted,
            vec![
                Authorization::AuthorizedWhenInUse,
                Authorization::AuthorizedAlways
            ]
        );
    }
}
