//! Prometheus collectors published by the polling cycle.
//!
//! [`PtlaMetrics`] owns its own [`Registry`] rather than relying on a
//! process-wide default. One instance is shared (behind an `Arc`) between the
//! background cycle, which writes, and the HTTP surface, which renders.
//! Collectors are label-keyed and internally synchronised, so no extra
//! locking is needed around updates.
//!
//! Gauges hold the last value written. A route that is absent from a cycle is
//! simply not updated and keeps reporting its previous value.

use anyhow::Result;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::fetch::FeedKind;

/// Upper bounds of the scrape latency histogram, in seconds.
pub const SCRAPE_LATENCY_BUCKETS: &[f64] = &[0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];

const ROUTE_LABELS: &[&str] = &["agency", "city", "route_id"];
const DELAY_LABELS: &[&str] = &["agency", "city", "route_id", "trip_id", "stop_id"];

pub struct PtlaMetrics {
    registry: Registry,
    pub events_ingested: IntCounterVec,
    pub scrape_status: GaugeVec,
    pub scrape_latency: HistogramVec,
    pub vehicle_count: GaugeVec,
    pub headway_seconds: GaugeVec,
    pub arrival_delay_seconds: GaugeVec,
    pub on_time_ratio: GaugeVec,
}

impl PtlaMetrics {
    /// Creates the collectors and registers them with a fresh registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let events_ingested = IntCounterVec::new(
            Opts::new("ptla_events_ingested_total", "Total GTFS-RT events ingested"),
            &["type"],
        )?;
        let scrape_status = GaugeVec::new(
            Opts::new("ptla_scrape_status", "Feed scrape status 1=success, 0=failure"),
            &["feed"],
        )?;
        let scrape_latency = HistogramVec::new(
            HistogramOpts::new("ptla_scrape_latency_seconds", "Feed scrape latency seconds")
                .buckets(SCRAPE_LATENCY_BUCKETS.to_vec()),
            &["feed"],
        )?;
        let vehicle_count = GaugeVec::new(
            Opts::new("ptla_vehicle_count_by_route", "Number of vehicles by route"),
            ROUTE_LABELS,
        )?;
        let headway_seconds = GaugeVec::new(
            Opts::new("ptla_headway_seconds", "Estimated headway seconds by route"),
            ROUTE_LABELS,
        )?;
        let arrival_delay_seconds = GaugeVec::new(
            Opts::new(
                "ptla_arrival_delay_seconds",
                "Arrival delay seconds by route/trip/stop",
            ),
            DELAY_LABELS,
        )?;
        let on_time_ratio = GaugeVec::new(
            Opts::new("ptla_on_time_ratio", "On-time ratio (|delay| <= 60s) by route"),
            ROUTE_LABELS,
        )?;

        registry.register(Box::new(events_ingested.clone()))?;
        registry.register(Box::new(scrape_status.clone()))?;
        registry.register(Box::new(scrape_latency.clone()))?;
        registry.register(Box::new(vehicle_count.clone()))?;
        registry.register(Box::new(headway_seconds.clone()))?;
        registry.register(Box::new(arrival_delay_seconds.clone()))?;
        registry.register(Box::new(on_time_ratio.clone()))?;

        Ok(Self {
            registry,
            events_ingested,
            scrape_status,
            scrape_latency,
            vehicle_count,
            headway_seconds,
            arrival_delay_seconds,
            on_time_ratio,
        })
    }

    pub fn record_ingested(&self, kind: FeedKind, count: u64) {
        self.events_ingested
            .with_label_values(&[kind.as_str()])
            .inc_by(count);
    }

    pub fn set_scrape_status(&self, kind: FeedKind, ok: bool) {
        self.scrape_status
            .with_label_values(&[kind.as_str()])
            .set(if ok { 1.0 } else { 0.0 });
    }

    pub fn observe_scrape_latency(&self, kind: FeedKind, seconds: f64) {
        self.scrape_latency
            .with_label_values(&[kind.as_str()])
            .observe(seconds);
    }

    pub fn set_vehicle_count(&self, agency: &str, city: &str, route_id: &str, count: u64) {
        self.vehicle_count
            .with_label_values(&[agency, city, route_id])
            .set(count as f64);
    }

    pub fn set_headway(&self, agency: &str, city: &str, route_id: &str, seconds: f64) {
        self.headway_seconds
            .with_label_values(&[agency, city, route_id])
            .set(seconds);
    }

    pub fn set_on_time_ratio(&self, agency: &str, city: &str, route_id: &str, ratio: f64) {
        self.on_time_ratio
            .with_label_values(&[agency, city, route_id])
            .set(ratio);
    }

    pub fn set_arrival_delay(
        &self,
        agency: &str,
        city: &str,
        route_id: &str,
        trip_id: &str,
        stop_id: &str,
        delay: i32,
    ) {
        self.arrival_delay_seconds
            .with_label_values(&[agency, city, route_id, trip_id, stop_id])
            .set(f64::from(delay));
    }

    /// Renders every registered collector in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Content type of [`Self::render`] output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
