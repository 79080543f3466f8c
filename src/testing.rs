//! Shared fixtures for unit tests: a canned-response transport and feed builders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::fetch::HttpClient;
use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use crate::gtfs_rt::{
    FeedEntity, FeedHeader, FeedMessage, TripDescriptor, TripUpdate, VehiclePosition,
};

/// Serves fixed responses keyed by URL; unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct MockClient {
    responses: HashMap<String, (u16, Vec<u8>)>,
    delay: Option<Duration>,
    panic_on_call: bool,
    calls: AtomicUsize,
}

impl MockClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), (200, body));
        self
    }

    pub(crate) fn with_feed(self, url: &str, feed: &FeedMessage) -> Self {
        use prost::Message;
        self.with_body(url, feed.encode_to_vec())
    }

    pub(crate) fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), (status, Vec::new()));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn panicking() -> Self {
        Self {
            panic_on_call: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_call {
            panic!("mock transport failure");
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let (status, body) = self
            .responses
            .get(req.url().as_str())
            .cloned()
            .unwrap_or((404, Vec::new()));
        let resp = http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        Ok(reqwest::Response::from(resp))
    }
}

pub(crate) fn feed(header_timestamp: Option<u64>, entity: Vec<FeedEntity>) -> FeedMessage {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: header_timestamp,
            incrementality: None,
            feed_version: None,
        },
        entity,
    }
}

pub(crate) fn vehicle(id: &str, route_id: Option<&str>, timestamp: Option<u64>) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        vehicle: Some(VehiclePosition {
            trip: route_id.map(|r| TripDescriptor {
                route_id: Some(r.to_string()),
                ..Default::default()
            }),
            timestamp,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A stop update as `(stop_id, arrival_delay, departure_delay)`.
pub(crate) type Stop<'a> = (&'a str, Option<i32>, Option<i32>);

pub(crate) fn trip_update(
    id: &str,
    route_id: Option<&str>,
    trip_id: Option<&str>,
    stops: &[Stop<'_>],
) -> FeedEntity {
    let event = |delay: Option<i32>| {
        delay.map(|d| StopTimeEvent {
            delay: Some(d),
            ..Default::default()
        })
    };

    FeedEntity {
        id: id.to_string(),
        trip_update: Some(TripUpdate {
            trip: TripDescriptor {
                trip_id: trip_id.map(str::to_string),
                route_id: route_id.map(str::to_string),
                ..Default::default()
            },
            stop_time_update: stops
                .iter()
                .map(|(stop_id, arrival, departure)| StopTimeUpdate {
                    stop_id: Some(stop_id.to_string()),
                    arrival: event(*arrival),
                    departure: event(*departure),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// An entity with neither a vehicle nor a trip update.
pub(crate) fn bare_entity(id: &str) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        ..Default::default()
    }
}
