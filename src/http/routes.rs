use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session state
        .route("/session", get(handlers::get_session_status))
        // Recording control
        .route("/session/recording/start", post(handlers::start_recording))
        .route("/session/recording/stop", post(handlers::stop_recording))
        // Replay control
        .route("/session/replay/start", post(handlers::start_replay))
        .route("/session/replay/stop", post(handlers::stop_replay))
        // Replay files
        .route("/replays", get(handlers::list_replays))
        .route("/replays/:name", delete(handlers::delete_replay))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
