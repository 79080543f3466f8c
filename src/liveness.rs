//! Last successful fetch time per feed, for health reporting.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::fetch::FeedKind;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LastFetch {
    pub vehicle_positions: Option<DateTime<Utc>>,
    pub trip_updates: Option<DateTime<Utc>>,
}

/// Both timestamps sit behind a single lock, held only to assign or copy.
#[derive(Debug, Default)]
pub struct Liveness {
    last: Mutex<LastFetch>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_fetched(&self, kind: FeedKind, at: DateTime<Utc>) {
        // A poisoned lock still holds two plain timestamps; keep using it.
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match kind {
            FeedKind::VehiclePositions => last.vehicle_positions = Some(at),
            FeedKind::TripUpdates => last.trip_updates = Some(at),
        }
    }

    pub fn last_fetch(&self) -> LastFetch {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fractional seconds since the Unix epoch.
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}
