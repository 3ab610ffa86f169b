use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::scrape::scheduler::{SchedulerStats, ScraperScheduler};
use crate::scrape::types::SourceStats;
use crate::scrape::Scraper;

/// Control surface consumed by the scraper dashboard.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<ScraperScheduler>,
    pub scraper: Arc<Scraper>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/scraper/stats", get(stats))
        .route("/scraper/sources", get(source_stats))
        .route("/scraper/start", post(start))
        .route("/scraper/stop", post(stop))
        .route("/scraper/trigger", post(trigger))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn stats(State(state): State<AppState>) -> Json<SchedulerStats> {
    Json(state.scheduler.get_stats())
}

async fn source_stats(State(state): State<AppState>) -> Json<HashMap<String, SourceStats>> {
    Json(state.scraper.source_stats())
}

async fn start(State(state): State<AppState>) -> Json<SchedulerStats> {
    state.scheduler.clone().start().await;
    Json(state.scheduler.get_stats())
}

async fn stop(State(state): State<AppState>) -> Json<SchedulerStats> {
    state.scheduler.stop().await;
    Json(state.scheduler.get_stats())
}

async fn trigger(State(state): State<AppState>) -> Json<SchedulerStats> {
    state.scheduler.trigger_manual_scrape().await;
    Json(state.scheduler.get_stats())
}
