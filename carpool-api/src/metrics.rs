use axum::{extract::State, http::header, response::IntoResponse, routing::get, Json, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

pub struct ApiMetrics {
    registry: Registry,
    pub booking_transitions: IntCounterVec,
    pub rides_posted: IntCounter,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("carpool".to_string()), None)?;

        let booking_transitions = IntCounterVec::new(
            Opts::new("booking_transitions_total", "Booking lifecycle transitions"),
            &["status"],
        )?;
        let rides_posted = IntCounter::new("rides_posted_total", "Rides offered by drivers")?;

        registry.register(Box::new(booking_transitions.clone()))?;
        registry.register(Box::new(rides_posted.clone()))?;

        Ok(Self { registry, booking_transitions, rides_posted })
    }

    pub fn record_booking(&self, status: &str) {
        self.booking_transitions.with_label_values(&[status]).inc();
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::InternalServerError(format!("Metrics encoding failed: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())], body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = ApiMetrics::new().unwrap();
        metrics.record_booking("ACCEPTED");
        metrics.record_booking("ACCEPTED");
        metrics.rides_posted.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("carpool_booking_transitions_total{status=\"ACCEPTED\"} 2"));
        assert!(text.contains("carpool_rides_posted_total 1"));
    }
}
