//! Delay samples and on-time accounting for one polling cycle.

use std::collections::BTreeMap;

use crate::gtfs_rt::trip_update::StopTimeUpdate;

/// A delay whose magnitude is at most this many seconds counts as on time.
pub const ON_TIME_TOLERANCE_SECS: u32 = 60;

/// Picks the delay reported by a stop update: arrival first, then departure.
pub fn effective_delay(update: &StopTimeUpdate) -> Option<i32> {
    update
        .arrival
        .as_ref()
        .and_then(|event| event.delay)
        .or_else(|| update.departure.as_ref().and_then(|event| event.delay))
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DelayKey {
    pub route_id: String,
    pub trip_id: String,
    pub stop_id: String,
}

/// Running on-time tally for one route.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OnTimeCounts {
    pub on_time: u64,
    pub total: u64,
}

impl OnTimeCounts {
    pub fn record(&mut self, delay: i32) {
        self.total += 1;
        if delay.unsigned_abs() <= ON_TIME_TOLERANCE_SECS {
            self.on_time += 1;
        }
    }

    /// Share of on-time samples, `0.0` when nothing was recorded.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.on_time as f64 / self.total as f64
        }
    }
}

/// Collects delay samples for a cycle.
///
/// The last delay per `(route, trip, stop)` wins; on-time counts accumulate
/// per route.
#[derive(Debug, Default)]
pub struct DelayAccumulator {
    last_delay: BTreeMap<DelayKey, i32>,
    on_time: BTreeMap<String, OnTimeCounts>,
}

impl DelayAccumulator {
    pub fn record(&mut self, key: DelayKey, delay: i32) {
        self.on_time
            .entry(key.route_id.clone())
            .or_default()
            .record(delay);
        self.last_delay.insert(key, delay);
    }

    pub fn last_delay(&self, key: &DelayKey) -> Option<i32> {
        self.last_delay.get(key).copied()
    }

    pub fn counts(&self, route_id: &str) -> Option<OnTimeCounts> {
        self.on_time.get(route_id).copied()
    }

    /// On-time ratio for every route that produced at least one sample.
    pub fn ratios(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.on_time
            .iter()
            .map(|(route_id, counts)| (route_id.as_str(), counts.ratio()))
    }

    pub fn sample_keys(&self) -> usize {
        self.last_delay.len()
    }
}
