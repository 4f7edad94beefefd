use crate::{
    AppState,
    handlers, // Import handlers module
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/matches/ai", post(handlers::create_ai_match))
        .route("/matches/suggested", post(handlers::create_suggested_match))
        .route("/matches", get(handlers::list_matches))
        .route("/matches/top", get(handlers::top_matches))
        .route("/matches/recent", get(handlers::recent_matches))
        .route("/matches/live", get(handlers::live_matches))
        .route("/matches/recent/live", get(handlers::live_recent))
        .route("/matches/{id}/vote", post(handlers::vote))
        .route("/status", get(handlers::status))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state) // Pass the application state
}
