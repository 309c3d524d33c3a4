pub mod config;
pub mod error;
pub mod examples;
pub mod install;
pub mod routes;
pub mod state;
pub mod uploads;

use axum::Router;
use state::AppState;
use tower_http::trace::TraceLayer;

/// Build the application with its middleware.
pub fn app(state: AppState) -> Router {
    routes::router(&state)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
