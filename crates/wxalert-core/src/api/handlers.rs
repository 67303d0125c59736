//! API handlers for the HTTP REST API

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::db::StoreStatus;
use crate::models::{AlertTrigger, StoredAlert, StoredReading};
use crate::monitor::{Monitor, PassSummary};

/// Readings included in a status response
const STATUS_READING_LIMIT: usize = 10;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub durable_store: bool,
    pub database: StoreStatus,
}

/// Health check endpoint
///
/// The service stays up without a database, so an unreachable one is
/// reported but does not fail the check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.monitor.store();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        durable_store: store.is_durable(),
        database: store.status().await,
    })
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Run one monitoring pass on demand
pub async fn check_weather(
    State(state): State<AppState>,
) -> Result<Json<PassSummary>, (StatusCode, Json<ErrorResponse>)> {
    match state.monitor.run_pass().await {
        Ok(report) => Ok(Json(report.summary())),
        Err(e) => {
            error!(error = %e, "On-demand weather check failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            ))
        }
    }
}

/// Status query parameters
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Look-back window in hours
    pub hours: Option<u64>,
    /// Restrict to one city
    pub city: Option<String>,
}

/// Recent readings and alerts
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub recent_weather_count: usize,
    pub recent_alerts_count: usize,
    pub recent_weather: Vec<StoredReading>,
    pub recent_alerts: Vec<StoredAlert>,
}

/// Recent history from the store
pub async fn weather_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Query(query) = query.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;
    let window = Duration::from_secs(query.hours.unwrap_or(24).saturating_mul(3600));
    let city = query.city.as_deref();
    let store = state.monitor.store();

    let mut recent_weather = store.query_recent_readings(city, window).await;
    let recent_alerts = store.query_recent_alerts(city, window).await;
    let recent_weather_count = recent_weather.len();
    recent_weather.truncate(STATUS_READING_LIMIT);

    Ok(Json(StatusResponse {
        status: "success".to_string(),
        timestamp: Utc::now(),
        recent_weather_count,
        recent_alerts_count: recent_alerts.len(),
        recent_weather,
        recent_alerts,
    }))
}

/// Configured trigger catalog
pub async fn list_triggers(State(state): State<AppState>) -> Json<Vec<AlertTrigger>> {
    Json(state.monitor.engine().catalog().iter().cloned().collect())
}
