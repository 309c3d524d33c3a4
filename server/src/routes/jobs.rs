use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use exifrelay_jobs::{FailureReason, JobError, JobId, JobStatus, Submission};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// Form fields posted by the browser front end.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub target_file_id: Option<String>,
    #[serde(default)]
    pub target_path: Option<String>,
    #[serde(default)]
    pub exiftool_command: Option<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

impl From<RunRequest> for Submission {
    fn from(request: RunRequest) -> Self {
        Submission {
            file_id: request.target_file_id,
            target_path: request.target_path,
            options: request.exiftool_command,
            output_filename: request.output_filename,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    status: &'static str,
    message: &'static str,
    process_id: JobId,
}

/// A job's status as reported by `GET /job_status/{id}`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusView {
    Running,
    Completed { exit_code: i32 },
    Failed { reason: String },
}

impl From<JobStatus> for StatusView {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Running => StatusView::Running,
            JobStatus::Completed { code } => StatusView::Completed { exit_code: code },
            JobStatus::Failed(reason) => StatusView::Failed {
                reason: match reason {
                    FailureReason::ToolNotInstalled => "tool_not_installed".to_string(),
                    other => other.to_string(),
                },
            },
        }
    }
}

/// POST /run_exiftool
///
/// Validates the request, starts the job and returns its id without waiting for the process.
async fn run_job(
    State(state): State<AppState>,
    Form(request): Form<RunRequest>,
) -> AppResult<Json<RunResponse>> {
    let submission = Submission::from(request);
    let plan = submission.plan(&state.config.tool, &state.config.upload_dir)?;
    let job_id = state.coordinator.start_job(plan).await?;
    tracing::info!(%job_id, "job submitted");
    Ok(Json(RunResponse {
        status: "success",
        message: "Exiftool command started.",
        process_id: job_id,
    }))
}

/// GET /stream_output/{process_id}
///
/// Streams the job's output as plain text until the job ends.
async fn stream_output(
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> AppResult<Response> {
    let job_id = parse_job_id(&process_id)?;
    let output = state.coordinator.stream_output(job_id).await?;
    tracing::debug!(%job_id, "relaying job output");
    let body = Body::from_stream(output.map(Ok::<_, Infallible>));
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

/// GET /job_status/{process_id}
async fn job_status(
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> AppResult<Json<StatusView>> {
    let job_id = parse_job_id(&process_id)?;
    let status = state.coordinator.get_job_status(job_id).await?;
    Ok(Json(status.into()))
}

/// Malformed ids are reported exactly like unknown ones.
fn parse_job_id(raw: &str) -> AppResult<JobId> {
    JobId::parse_str(raw).map_err(|_| AppError::Job(JobError::NotFound(format!("Job {raw}"))))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run_exiftool", post(run_job))
        .route("/stream_output/{process_id}", get(stream_output))
        .route("/job_status/{process_id}", get(job_status))
}
