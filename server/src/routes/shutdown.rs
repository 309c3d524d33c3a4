use crate::state::AppState;
use axum::{extract::State, routing::post, Router};

/// POST /shutdown
///
/// Stops accepting connections; requests already in flight are drained.
async fn shutdown(State(state): State<AppState>) -> &'static str {
    tracing::info!("received shutdown request");
    state.shutdown.notify_one();
    "Server shutting down..."
}

pub fn router() -> Router<AppState> {
    Router::new().route("/shutdown", post(shutdown))
}
