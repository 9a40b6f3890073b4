//! Geographic position type shared by the device feed, the store and the table.
//!
//! A position is a latitude/longitude pair in degrees. Positions read back from
//! the remote store also carry the timestamp the store assigned on write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A device's last known location.
///
/// # Timestamps
///
/// Fixes captured locally have no timestamp. The store stamps every write with
/// its own clock, so a position mirrored from the store carries `Some(timestamp)`
/// when the stored document had a parseable one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees north of the equator, in [-90, 90]
    pub latitude: f64,
    /// Degrees east of Greenwich, in [-180, 180]
    pub longitude: f64,
    /// Server-assigned write time, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Position {
    /// Creates an unstamped position.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Position {
            latitude,
            longitude,
            timestamp: None,
        }
    }

    /// Returns a copy stamped with the given write time.
    pub fn stamped(self, timestamp: DateTime<Utc>) -> Self {
        Position {
            timestamp: Some(timestamp),
            ..self
        }
    }

    /// Returns true when both coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Coordinate equality, ignoring timestamps.
    pub fn same_coordinate(&self, other: &Position) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}
