//! HTTP surface: service index, health and Prometheus exposition.
//!
//! Handlers only read shared state; the polling cycle writes it from its own
//! task.

mod health;
mod metrics;

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::liveness::Liveness;
use crate::metrics::PtlaMetrics;

pub use health::HealthResponse;

#[derive(Clone)]
pub struct AppState {
    pub agency_id: String,
    pub city: String,
    pub metrics: Arc<PtlaMetrics>,
    pub liveness: Arc<Liveness>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::render_metrics))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub metrics: &'static str,
    pub health: &'static str,
    pub agency: String,
    pub city: String,
}

async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "Public Transport Live Arrivals (PTLA)",
        metrics: "/metrics",
        health: "/health",
        agency: state.agency_id,
        city: state.city,
    })
}
