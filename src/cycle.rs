//! One polling cycle: fetch both feeds, aggregate per route, publish.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fetch::{FeedFetcher, FeedKind, HttpClient};
use crate::liveness::Liveness;
use crate::metrics::PtlaMetrics;
use crate::output::{Snapshot, append_snapshot};
use crate::stats::{CycleStats, RouteAccumulator};

/// Static inputs of a cycle.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub agency_id: String,
    pub city: String,
    pub vehicle_positions_url: String,
    pub trip_updates_url: String,
    pub log_path: PathBuf,
}

impl From<&Config> for CycleSettings {
    fn from(config: &Config) -> Self {
        Self {
            agency_id: config.agency_id.clone(),
            city: config.city.clone(),
            vehicle_positions_url: config.vehicle_positions_url.clone(),
            trip_updates_url: config.trip_updates_url.clone(),
            log_path: config.log_path.clone(),
        }
    }
}

pub struct CycleAggregator<C> {
    settings: CycleSettings,
    fetcher: FeedFetcher<C>,
    metrics: Arc<PtlaMetrics>,
    liveness: Arc<Liveness>,
}

impl<C: HttpClient> CycleAggregator<C> {
    pub fn new(
        settings: CycleSettings,
        fetcher: FeedFetcher<C>,
        metrics: Arc<PtlaMetrics>,
        liveness: Arc<Liveness>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            metrics,
            liveness,
        }
    }

    pub fn fetcher(&self) -> &FeedFetcher<C> {
        &self.fetcher
    }

    /// Runs one complete cycle and returns the route statistics it derived.
    ///
    /// An unavailable feed contributes nothing; a snapshot that cannot be
    /// written is logged and dropped. Neither stops the cycle.
    #[tracing::instrument(skip(self), fields(agency = %self.settings.agency_id))]
    pub async fn run_cycle(&self) -> CycleStats {
        let s = &self.settings;
        let mut acc = RouteAccumulator::new();

        let vehicle_positions = self
            .fetcher
            .fetch(FeedKind::VehiclePositions, &s.vehicle_positions_url)
            .await;
        if let Some(feed) = &vehicle_positions {
            self.metrics
                .record_ingested(FeedKind::VehiclePositions, feed.entity.len() as u64);
            let vehicles = acc.ingest_vehicle_positions(feed);
            debug!(entities = feed.entity.len(), vehicles, "Vehicle positions ingested");
        }

        let trip_updates = self
            .fetcher
            .fetch(FeedKind::TripUpdates, &s.trip_updates_url)
            .await;
        if let Some(feed) = &trip_updates {
            self.metrics
                .record_ingested(FeedKind::TripUpdates, feed.entity.len() as u64);
            let samples = acc.ingest_trip_updates(feed, |key, delay| {
                self.metrics.set_arrival_delay(
                    &s.agency_id,
                    &s.city,
                    &key.route_id,
                    &key.trip_id,
                    &key.stop_id,
                    delay,
                );
            });
            debug!(
                entities = feed.entity.len(),
                samples,
                delay_series = acc.delays().sample_keys(),
                "Trip updates ingested"
            );
        }

        let stats = acc.finish();
        self.publish(&stats);

        let snapshot = Snapshot::new(&s.agency_id, &s.city, &stats);
        if let Err(e) = append_snapshot(&s.log_path, &snapshot) {
            warn!(error = %e, path = %s.log_path.display(), "Failed to write snapshot");
        }

        let now = Utc::now();
        if vehicle_positions.is_some() {
            self.liveness.mark_fetched(FeedKind::VehiclePositions, now);
        }
        if trip_updates.is_some() {
            self.liveness.mark_fetched(FeedKind::TripUpdates, now);
        }

        info!(
            routes = stats.len(),
            vehicle_positions = vehicle_positions.is_some(),
            trip_updates = trip_updates.is_some(),
            "Cycle complete"
        );
        stats
    }

    /// Writes per-route gauges. Dimensions a route lacks this cycle keep
    /// their previous value.
    fn publish(&self, stats: &CycleStats) {
        let (agency, city) = (&self.settings.agency_id, &self.settings.city);

        for (route_id, route) in stats {
            if let Some(count) = route.vehicle_count {
                self.metrics.set_vehicle_count(agency, city, route_id, count);
            }
            if let Some(headway) = route.headway_seconds {
                self.metrics.set_headway(agency, city, route_id, headway);
            }
            if let Some(ratio) = route.on_time_ratio {
                self.metrics.set_on_time_ratio(agency, city, route_id, ratio);
            }
        }
    }
}
