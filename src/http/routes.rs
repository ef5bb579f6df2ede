use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/sessions/:context/join", post(handlers::join))
        .route("/sessions/:context/record/start", post(handlers::start_recording))
        .route("/sessions/:context/record/stop", post(handlers::stop_recording))
        .route("/sessions/:context/leave", post(handlers::leave))
        // Queries
        .route("/sessions/:context/status", get(handlers::get_status))
        .route(
            "/sessions/:context/segments/recent",
            get(handlers::get_recent_segment),
        )
        .route(
            "/sessions/:context/segments/:id",
            get(handlers::get_segment),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
