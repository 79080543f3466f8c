use axum::{Json, extract::State};
use serde::Serialize;

use super::AppState;
use crate::liveness::epoch_seconds;

/// Liveness report: the service is up, plus when each feed last returned
/// data (epoch seconds, `null` if never).
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_vehicle_positions_fetch: Option<f64>,
    pub last_trip_updates_fetch: Option<f64>,
}

pub(super) async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let last = state.liveness.last_fetch();
    Json(HealthResponse {
        status: "ok",
        last_vehicle_positions_fetch: last.vehicle_positions.map(epoch_seconds),
        last_trip_updates_fetch: last.trip_updates.map(epoch_seconds),
    })
}
