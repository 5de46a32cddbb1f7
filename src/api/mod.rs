//! HTTP surface over [`TaskService`].

pub mod error;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{ApiError, ErrorBody};

use crate::service::{TaskInfo, TaskOutputData, TaskService};
use crate::task::TaskId;

pub const HEALTH_MESSAGE: &str = "Hello! I`m OK.";

/// Body of `POST /tasks/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInputData {
    pub input_data: String,
}

/// Body of `POST /tasks/run` and `POST /tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdRequest {
    pub task_id: TaskId,
}

/// Build the router with tracing and CORS layers applied.
pub fn router(service: TaskService) -> Router {
    Router::new()
        .route("/", get(healthcheck))
        .route("/healthcheck", get(healthcheck))
        .route("/tasks/create", post(create_task))
        .route("/tasks/run", post(run_task))
        .route("/tasks/cancel", post(cancel_task))
        .route("/status/{task_id}", get(task_status))
        .route("/download/{task_id}", get(download_output))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(service)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn healthcheck() -> &'static str {
    HEALTH_MESSAGE
}

// ── Tasks ───────────────────────────────────────────────────────────────

async fn create_task(
    State(service): State<TaskService>,
    Json(body): Json<TaskInputData>,
) -> Result<impl IntoResponse, ApiError> {
    let info = service.create_task(&body.input_data).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

async fn run_task(
    State(service): State<TaskService>,
    Json(body): Json<TaskIdRequest>,
) -> Result<Json<TaskInfo>, ApiError> {
    Ok(Json(service.run_task(body.task_id).await?))
}

async fn cancel_task(
    State(service): State<TaskService>,
    Json(body): Json<TaskIdRequest>,
) -> Result<Json<TaskInfo>, ApiError> {
    Ok(Json(service.cancel_task(body.task_id).await?))
}

async fn task_status(
    State(service): State<TaskService>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<TaskInfo>, ApiError> {
    Ok(Json(service.get_task_status(task_id).await?))
}

async fn download_output(
    State(service): State<TaskService>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<TaskOutputData>, ApiError> {
    Ok(Json(service.get_task_output(task_id).await?))
}
