//! API routes

use axum::{routing::get, Router};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Monitoring passes
        .route(
            "/api/v1/weather/check",
            get(handlers::check_weather).post(handlers::check_weather),
        )
        .route("/api/v1/weather/status", get(handlers::weather_status))

        // Trigger catalog
        .route("/api/v1/triggers", get(handlers::list_triggers))

        .with_state(state)
}
