//! Client-side mirror of the remote position collection.
//!
//! The table is never patched: each snapshot produces a brand new table that
//! replaces the previous one wholesale. Users who stop publishing stay in the
//! table until their document disappears from the collection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::SyncError;
use crate::store::{Document, Snapshot};
use crate::sync::region::Region;
use crate::sync::types::{Position, UserId};

/// Mapping from user to that user's last published position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionTable {
    entries: HashMap<UserId, Position>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a table from a full snapshot.
    ///
    /// Documents without a numeric latitude and longitude are skipped. Range
    /// is not checked here: other clients' data is mirrored as written. A
    /// missing or unparseable timestamp does not disqualify an entry.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let entries = snapshot
            .documents
            .iter()
            .filter_map(|doc| match parse_document(doc) {
                Some(position) => Some((UserId::new(doc.id.as_str()), position)),
                None => {
                    debug!(
                        "{}",
                        SyncError::RemoteReadMalformed {
                            document: doc.id.clone()
                        }
                    );
                    None
                }
            })
            .collect();

        PositionTable { entries }
    }

    pub fn get(&self, user: &UserId) -> Option<&Position> {
        self.entries.get(user)
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.entries.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &Position)> {
        self.entries.iter()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.entries.values()
    }

    /// Entries whose coordinates differ from `current`.
    ///
    /// The map draws the device itself separately, so every entry sitting
    /// exactly on the device's coordinate is left out.
    pub fn others_than(&self, current: Option<&Position>) -> Vec<(&UserId, &Position)> {
        let mut others: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, position)| current.is_none_or(|c| !c.same_coordinate(position)))
            .collect();
        others.sort_by(|a, b| a.0.cmp(b.0));
        others
    }

    /// Smallest region showing every mirrored position.
    pub fn bounds(&self) -> Option<Region> {
        Region::bounding(self.entries.values())
    }
}

impl FromIterator<(UserId, Position)> for PositionTable {
    fn from_iter<I: IntoIterator<Item = (UserId, Position)>>(iter: I) -> Self {
        PositionTable {
            entries: iter.into_iter().collect(),
        }
    }
}

fn parse_document(doc: &Document) -> Option<Position> {
    let latitude = doc.data.get("latitude")?.as_f64()?;
    let longitude = doc.data.get("longitude")?.as_f64()?;

    let timestamp = doc
        .data
        .get("timestamp")
        .and_then(|value| value.as_str())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc));

    Some(Position {
        latitude,
        longitude,
        timestamp,
    })
}
