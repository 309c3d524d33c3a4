use crate::examples::load_examples;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;

async fn get_examples(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(load_examples(&state.config.examples_file).await)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/get_examples", get(get_examples))
}
