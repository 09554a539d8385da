//! HTTP surface: submit a task, poll its status, retrieve its result.
//!
//! Thin by design. Validation and the provider size probe happen here so
//! obviously doomed submissions never reach the queue; everything else is
//! the queue's business.

use crate::error::ProbeError;
use crate::github::GithubProbe;
use crate::queue::{RepoTask, TaskQueue};
use crate::services::{AnalyzerOptions, Report};
use crate::types::{TaskId, TaskStatus};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<TaskQueue>,
    pub probe: Arc<GithubProbe>,
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/:id/status", get(task_status))
        .route("/api/tasks/:id/result", get(task_result))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until the process exits.
pub async fn serve(state: AppState, port: u16) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub exclude_file_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_dir_patterns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub id: TaskId,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: TaskStatus,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    #[serde(flatten)]
    pub report: Report,
    pub fetch_ms: u64,
    pub analysis_ms: u64,
}

/// JSON error envelope: `{"error", "code"}` with an HTTP status.
struct ApiError {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    fn task_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "TASK_NOT_FOUND", "Task not found")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "code": self.code,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<ProbeError> for ApiError {
    fn from(err: ProbeError) -> Self {
        let status = match err {
            ProbeError::NotFound => StatusCode::NOT_FOUND,
            ProbeError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProbeError::Api(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

/// POST /api/tasks
async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_slug("owner", &req.owner)?;
    validate_slug("name", &req.name)?;

    let size_bytes = state.probe.repo_size_bytes(&req.owner, &req.name).await?;

    if size_bytes > state.queue.max_repo_bytes() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "REPO_TOO_LARGE",
            format!(
                "Repository size is too large: {} MB",
                size_bytes / (1024 * 1024)
            ),
        ));
    }

    let options = AnalyzerOptions {
        exclude_file_patterns: req.exclude_file_patterns,
        exclude_dir_patterns: req.exclude_dir_patterns,
    };
    let task = RepoTask::new(req.owner, req.name, size_bytes, options);

    let id = state.queue.add(task).await.map_err(|err| {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.code(), err.to_string())
    })?;

    Ok((StatusCode::ACCEPTED, Json(CreateTaskResponse { id })))
}

/// GET /api/tasks/{id}/status
async fn task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let (_, task) = lookup(&state, &id)?;
    let status = task.status();

    Ok(Json(StatusResponse {
        status,
        done: status.is_done(),
        error: task.error(),
    }))
}

/// GET /api/tasks/{id}/result
///
/// Retrieval is destructive: a successfully returned result removes the
/// task from the cache.
async fn task_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let (task_id, task) = lookup(&state, &id)?;

    if !task.status().is_done() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "TASK_NOT_DONE",
            "Task not done",
        ));
    }

    state.queue.delete(&task_id);

    let outcome = task.outcome();

    if let Some(error) = outcome.error {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "TASK_FAILED", error));
    }

    let report = outcome.report.ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "RESULT_MISSING",
            "Task finished without a result",
        )
    })?;

    Ok(Json(ResultResponse {
        report,
        fetch_ms: outcome.fetch_duration.as_millis() as u64,
        analysis_ms: outcome.analysis_duration.as_millis() as u64,
    }))
}

fn lookup(state: &AppState, raw_id: &str) -> Result<(TaskId, Arc<RepoTask>), ApiError> {
    let id: TaskId = raw_id.parse().map_err(|_| ApiError::task_not_found())?;
    let task = state.queue.get(&id).ok_or_else(ApiError::task_not_found)?;
    Ok((id, task))
}

fn validate_slug(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() || value.contains('/') || value.contains(char::is_whitespace) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_REPO",
            format!("Invalid repository {field}"),
        ));
    }
    Ok(())
}
