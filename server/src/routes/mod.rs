pub mod examples;
pub mod health;
pub mod install;
pub mod jobs;
pub mod shutdown;
pub mod uploads;

use crate::state::AppState;
use axum::Router;

/// Every route the server exposes.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(jobs::router())
        .merge(uploads::router(state.config.max_upload_bytes()))
        .merge(examples::router())
        .merge(install::router())
        .merge(shutdown::router())
}
