// src/handlers/mod.rs
pub mod my_rides_handler;

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "vocabularyVersion": state.my_rides_service.vocabulary().version(),
        "cachedSnapshots": state.snapshot_cache.len().await,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/my-rides", get(my_rides_handler::get_overview))
        .route("/my-rides/mode", get(my_rides_handler::get_mode))
        .route("/my-rides/driver", get(my_rides_handler::get_driver_rides))
        .route("/my-rides/passenger", get(my_rides_handler::get_passenger_bookings))
        .route("/my-rides/stream", get(my_rides_handler::stream_overview))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
