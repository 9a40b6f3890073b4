//! Map camera regions.

use serde::{Deserialize, Serialize};

use crate::sync::types::Position;

/// Camera center used before the first fix arrives (San Francisco).
pub const DEFAULT_CENTER: (f64, f64) = (37.7749, -122.4194);

/// Default camera span in degrees.
pub const DEFAULT_SPAN: f64 = 0.1;

/// Smallest span a fitted region may have, so a single user still shows
/// some surroundings.
pub const MIN_SPAN: f64 = 0.005;

/// Extra room around fitted positions, as a fraction of their extent.
pub const FIT_PADDING: f64 = 0.2;

/// A rectangular map area described by its center and span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Default for Region {
    fn default() -> Self {
        Region {
            center_latitude: DEFAULT_CENTER.0,
            center_longitude: DEFAULT_CENTER.1,
            latitude_delta: DEFAULT_SPAN,
            longitude_delta: DEFAULT_SPAN,
        }
    }
}

impl Region {
    /// Same span, moved to `position`.
    pub fn centered_on(self, position: &Position) -> Self {
        Region {
            center_latitude: position.latitude,
            center_longitude: position.longitude,
            ..self
        }
    }

    /// Padded bounding rectangle of `positions`, or `None` when empty.
    pub fn bounding<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut positions = positions.into_iter();
        let first = positions.next()?;

        let (mut south, mut north) = (first.latitude, first.latitude);
        let (mut west, mut east) = (first.longitude, first.longitude);
        for p in positions {
            south = south.min(p.latitude);
            north = north.max(p.latitude);
            west = west.min(p.longitude);
            east = east.max(p.longitude);
        }

        let latitude_delta = ((north - south) * (1.0 + FIT_PADDING)).clamp(MIN_SPAN, 180.0);
        let longitude_delta = ((east - west) * (1.0 + FIT_PADDING)).clamp(MIN_SPAN, 360.0);

        Some(Region {
            center_latitude: (north + south) / 2.0,
            center_longitude: (east + west) / 2.0,
            latitude_delta,
            longitude_delta,
        })
    }

    pub fn contains(&self, position: &Position) -> bool {
        (position.latitude - self.center_latitude).abs() <= self.latitude_delta / 2.0
            && (position.longitude - self.center_longitude).abs() <= self.longitude_delta / 2.0
    }
}
