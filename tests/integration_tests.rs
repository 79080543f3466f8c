use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use prost::Message;
use ptla::cycle::{CycleAggregator, CycleSettings};
use ptla::fetch::{FeedFetcher, HttpClient};
use ptla::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use ptla::gtfs_rt::{
    FeedEntity, FeedHeader, FeedMessage, TripDescriptor, TripUpdate, VehiclePosition,
};
use ptla::liveness::Liveness;
use ptla::metrics::PtlaMetrics;
use ptla::routes::{AppState, create_router};
use ptla::scheduler::Scheduler;
use tower::ServiceExt;

const VP_URL: &str = "http://agency.test/gtfs-rt/vehicle-positions";
const TU_URL: &str = "http://agency.test/gtfs-rt/trip-updates";

struct FixtureClient(HashMap<String, Vec<u8>>);

#[async_trait]
impl HttpClient for FixtureClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let resp = match self.0.get(req.url().as_str()) {
            Some(body) => http::Response::builder().status(200).body(body.clone()),
            None => http::Response::builder().status(404).body(Vec::new()),
        };
        Ok(reqwest::Response::from(resp.unwrap()))
    }
}

fn header(timestamp: Option<u64>) -> FeedHeader {
    FeedHeader {
        gtfs_realtime_version: "2.0".to_string(),
        timestamp,
        incrementality: None,
        feed_version: None,
    }
}

fn vehicle_positions() -> FeedMessage {
    let vehicle = |id: &str, route: &str, ts: Option<u64>| FeedEntity {
        id: id.to_string(),
        vehicle: Some(VehiclePosition {
            trip: Some(TripDescriptor {
                route_id: Some(route.to_string()),
                ..Default::default()
            }),
            timestamp: ts,
            ..Default::default()
        }),
        ..Default::default()
    };

    FeedMessage {
        header: header(Some(1_300)),
        entity: vec![
            vehicle("v1", "Red", Some(1_000)),
            vehicle("v2", "Red", Some(1_300)),
            vehicle("v3", "Red", Some(1_120)),
            // falls back to the header timestamp
            vehicle("v4", "Blue", None),
            vehicle("v5", "Blue", Some(1_240)),
        ],
    }
}

fn trip_updates() -> FeedMessage {
    let stop = |stop_id: &str, arrival: Option<i32>, departure: Option<i32>| StopTimeUpdate {
        stop_id: Some(stop_id.to_string()),
        arrival: arrival.map(|d| StopTimeEvent {
            delay: Some(d),
            ..Default::default()
        }),
        departure: departure.map(|d| StopTimeEvent {
            delay: Some(d),
            ..Default::default()
        }),
        ..Default::default()
    };

    FeedMessage {
        header: header(Some(1_300)),
        entity: vec![
            FeedEntity {
                id: "tu-1".to_string(),
                trip_update: Some(TripUpdate {
                    trip: TripDescriptor {
                        trip_id: Some("red-101".to_string()),
                        route_id: Some("Red".to_string()),
                        ..Default::default()
                    },
                    stop_time_update: vec![
                        stop("place-pktrm", Some(30), None),
                        stop("place-dwnxg", Some(-45), Some(200)),
                        stop("place-sstat", None, Some(120)),
                    ],
                    ..Default::default()
                }),
                ..Default::default()
            },
            FeedEntity {
                id: "tu-2".to_string(),
                trip_update: Some(TripUpdate {
                    trip: TripDescriptor {
                        route_id: Some("Green".to_string()),
                        ..Default::default()
                    },
                    stop_time_update: vec![stop("place-gover", None, None)],
                    ..Default::default()
                }),
                ..Default::default()
            },
        ],
    }
}

struct Harness {
    aggregator: Arc<CycleAggregator<FixtureClient>>,
    state: AppState,
    log_path: std::path::PathBuf,
}

fn harness(log_name: &str) -> Harness {
    let client = FixtureClient(HashMap::from([
        (VP_URL.to_string(), vehicle_positions().encode_to_vec()),
        (TU_URL.to_string(), trip_updates().encode_to_vec()),
    ]));
    let metrics = Arc::new(PtlaMetrics::new().unwrap());
    let liveness = Arc::new(Liveness::new());
    let log_path = std::env::temp_dir().join(log_name);
    let _ = std::fs::remove_file(&log_path);

    let settings = CycleSettings {
        agency_id: "mbta".to_string(),
        city: "boston".to_string(),
        vehicle_positions_url: VP_URL.to_string(),
        trip_updates_url: TU_URL.to_string(),
        log_path: log_path.clone(),
    };
    let aggregator = Arc::new(CycleAggregator::new(
        settings,
        FeedFetcher::new(client, metrics.clone()),
        metrics.clone(),
        liveness.clone(),
    ));

    Harness {
        aggregator,
        state: AppState {
            agency_id: "mbta".to_string(),
            city: "boston".to_string(),
            metrics,
            liveness,
        },
        log_path,
    }
}

async fn get_text(state: AppState, uri: &str) -> (StatusCode, String) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_full_cycle_statistics() {
    let h = harness("ptla_it_stats.log");

    let stats = h.aggregator.run_cycle().await;

    let routes: Vec<_> = stats.keys().cloned().collect();
    // Green only carries a trip update without delays, so it yields nothing
    assert_eq!(routes, vec!["Blue", "Red"]);

    // Red: sightings 1000, 1120, 1300 -> gaps 120, 180
    assert_eq!(stats["Red"].vehicle_count, Some(3));
    assert_eq!(stats["Red"].headway_seconds, Some(150.0));
    // delays 30, -45 (arrival wins over 200), 120 -> 2 of 3 on time
    let ratio = stats["Red"].on_time_ratio.unwrap();
    assert!((ratio - 2.0 / 3.0).abs() < 1e-9);

    // Blue: 1240 and header fallback 1300
    assert_eq!(stats["Blue"].vehicle_count, Some(2));
    assert_eq!(stats["Blue"].headway_seconds, Some(60.0));
    assert_eq!(stats["Blue"].on_time_ratio, None);

    let _ = std::fs::remove_file(&h.log_path);
}

#[tokio::test]
async fn test_metrics_and_health_after_cycle() {
    let h = harness("ptla_it_http.log");

    let (_, health) = get_text(h.state.clone(), "/health").await;
    let json: serde_json::Value = serde_json::from_str(&health).unwrap();
    assert!(json["last_trip_updates_fetch"].is_null());

    h.aggregator.run_cycle().await;

    let (status, text) = get_text(h.state.clone(), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("ptla_events_ingested_total{type=\"vehicle_positions\"} 5"));
    assert!(text.contains("ptla_events_ingested_total{type=\"trip_updates\"} 2"));
    assert!(text.contains("ptla_scrape_status{feed=\"trip_updates\"} 1"));
    let delay_line = text
        .lines()
        .find(|l| l.starts_with("ptla_arrival_delay_seconds{") && l.contains("place-dwnxg"))
        .unwrap();
    assert!(delay_line.contains("trip_id=\"red-101\""));
    assert!(delay_line.contains("route_id=\"Red\""));
    assert!(delay_line.contains("} -45"));
    assert!(text.contains(
        "ptla_headway_seconds{agency=\"mbta\",city=\"boston\",route_id=\"Red\"} 150"
    ));

    let (_, health) = get_text(h.state, "/health").await;
    let json: serde_json::Value = serde_json::from_str(&health).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["last_vehicle_positions_fetch"].as_f64().unwrap() > 0.0);
    assert!(json["last_trip_updates_fetch"].as_f64().unwrap() > 0.0);

    let _ = std::fs::remove_file(&h.log_path);
}

#[tokio::test]
async fn test_scheduler_writes_one_snapshot_per_cycle() {
    let h = harness("ptla_it_snapshots.log");

    Scheduler::new(h.aggregator.clone(), Duration::from_millis(5))
        .run(2)
        .await;

    let content = std::fs::read_to_string(&h.log_path).unwrap();
    let docs: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(docs.len(), 2);

    for doc in &docs {
        assert_eq!(doc["type"], "ptla_snapshot");
        assert_eq!(doc["agency"], "mbta");
        assert_eq!(doc["city"], "boston");
        assert!(doc["@timestamp"].is_string());

        let ids: Vec<_> = doc["routes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["route_id"].as_str().unwrap().to_string())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let red = doc["routes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["route_id"] == "Red")
            .unwrap();
        assert_eq!(red["vehicle_count"], 3);
        assert_eq!(red["headway_seconds"], 150.0);
    }

    let _ = std::fs::remove_file(&h.log_path);
}
