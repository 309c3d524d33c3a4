use crate::install::{InstallReport, Installer, Platform};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct InstallRequest {
    #[serde(default)]
    pub os_type: Option<String>,
}

/// POST /install_exiftool
async fn install_tool(
    State(state): State<AppState>,
    Json(request): Json<InstallRequest>,
) -> (StatusCode, Json<InstallReport>) {
    let installer = Installer::new(state.config.tool.clone(), Platform::detect());
    let (status, report) = installer.install(request.os_type.as_deref()).await;
    (status, Json(report))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/install_exiftool", post(install_tool))
}
