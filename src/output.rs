//! Per-cycle snapshot document and its append-only JSON-lines sink.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::stats::CycleStats;

pub const SNAPSHOT_TYPE: &str = "ptla_snapshot";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSnapshot {
    pub route_id: String,
    pub vehicle_count: u64,
    pub on_time_ratio: f64,
    pub headway_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub agency: String,
    pub city: String,
    pub routes: Vec<RouteSnapshot>,
}

impl Snapshot {
    /// Builds the snapshot for a cycle. Routes keep the map's id order and
    /// dimensions absent this cycle are reported as zero.
    pub fn new(agency: &str, city: &str, stats: &CycleStats) -> Self {
        let routes = stats
            .iter()
            .map(|(route_id, s)| RouteSnapshot {
                route_id: route_id.clone(),
                vehicle_count: s.vehicle_count.unwrap_or(0),
                on_time_ratio: s.on_time_ratio.unwrap_or(0.0),
                headway_seconds: s.headway_seconds.unwrap_or(0.0),
            })
            .collect();

        Snapshot {
            timestamp: Utc::now(),
            kind: SNAPSHOT_TYPE,
            agency: agency.to_string(),
            city: city.to_string(),
            routes,
        }
    }
}

/// Appends `snapshot` as one JSON line to `path`, creating parent
/// directories and the file as needed.
pub fn append_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let line = serde_json::to_string(snapshot)?;
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{line}")?;

    debug!(path = %path.display(), routes = snapshot.routes.len(), "Snapshot appended");
    Ok(())
}
