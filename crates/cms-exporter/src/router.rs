use std::sync::Arc;

use axum::{Router, routing::get};

use crate::{handlers, scrape::Scraper};

pub struct ExporterState {
    pub scraper: Arc<Scraper>,
}

impl ExporterState {
    pub fn new(scraper: Arc<Scraper>) -> Self {
        Self { scraper }
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    Router::new()
        .route("/health/live", get(handlers::health::health_live))
        .route("/metrics", get(handlers::metrics::prometheus_metrics))
        .with_state(state)
}
