use std::collections::BTreeMap;

use serde::Serialize;

use crate::delay::{DelayAccumulator, DelayKey, effective_delay};
use crate::gtfs_rt::{FeedHeader, FeedMessage, VehiclePosition};
use crate::headway::median_headway;

/// Statistics derived for one route in one cycle.
///
/// A dimension is `None` when the route contributed nothing to it this cycle;
/// the corresponding gauge is then left untouched.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RouteStats {
    pub vehicle_count: Option<u64>,
    pub headway_seconds: Option<f64>,
    pub on_time_ratio: Option<f64>,
}

/// Route statistics for a cycle, ordered by route id.
pub type CycleStats = BTreeMap<String, RouteStats>;

/// Cycle-scoped per-route accumulators. Build a fresh one every cycle.
///
/// Entities without a route are grouped under the empty route id.
#[derive(Debug, Default)]
pub struct RouteAccumulator {
    vehicle_timestamps: BTreeMap<String, Vec<u64>>,
    vehicle_counts: BTreeMap<String, u64>,
    delays: DelayAccumulator,
}

impl RouteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every entity carrying a vehicle record. Returns how many did.
    pub fn ingest_vehicle_positions(&mut self, feed: &FeedMessage) -> usize {
        let mut vehicles = 0;

        for v in feed.entity.iter().filter_map(|e| e.vehicle.as_ref()) {
            let route_id = v
                .trip
                .as_ref()
                .and_then(|t| t.route_id.clone())
                .unwrap_or_default();
            let ts = effective_timestamp(v, &feed.header);

            self.vehicle_timestamps
                .entry(route_id.clone())
                .or_default()
                .push(ts);
            *self.vehicle_counts.entry(route_id).or_default() += 1;
            vehicles += 1;
        }

        vehicles
    }

    /// Adds every delay-bearing stop update of every trip update.
    ///
    /// `on_delay` is called for each sample as it is encountered. Returns the
    /// number of samples recorded.
    pub fn ingest_trip_updates<F>(&mut self, feed: &FeedMessage, mut on_delay: F) -> usize
    where
        F: FnMut(&DelayKey, i32),
    {
        let mut samples = 0;

        for entity in &feed.entity {
            let Some(tu) = &entity.trip_update else {
                continue;
            };
            let route_id = tu.trip.route_id.clone().unwrap_or_default();
            let trip_id = tu
                .trip
                .trip_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| entity.id.clone());

            for stu in &tu.stop_time_update {
                let Some(delay) = effective_delay(stu) else {
                    continue;
                };
                let key = DelayKey {
                    route_id: route_id.clone(),
                    trip_id: trip_id.clone(),
                    stop_id: stu.stop_id.clone().unwrap_or_default(),
                };
                on_delay(&key, delay);
                self.delays.record(key, delay);
                samples += 1;
            }
        }

        samples
    }

    pub fn delays(&self) -> &DelayAccumulator {
        &self.delays
    }

    /// Consumes the accumulators and derives per-route statistics.
    pub fn finish(self) -> CycleStats {
        let mut stats = CycleStats::new();

        for (route_id, count) in self.vehicle_counts {
            stats.entry(route_id).or_default().vehicle_count = Some(count);
        }

        for (route_id, timestamps) in &self.vehicle_timestamps {
            stats.entry(route_id.clone()).or_default().headway_seconds =
                Some(median_headway(timestamps));
        }

        for (route_id, ratio) in self.delays.ratios() {
            stats.entry(route_id.to_string()).or_default().on_time_ratio = Some(ratio);
        }

        stats
    }
}

/// The vehicle's own timestamp when set and non-zero, else the feed header's,
/// else 0.
pub fn effective_timestamp(vehicle: &VehiclePosition, header: &FeedHeader) -> u64 {
    vehicle
        .timestamp
        .filter(|&ts| ts != 0)
        .or(header.timestamp.filter(|&ts| ts != 0))
        .unwrap_or(0)
}
