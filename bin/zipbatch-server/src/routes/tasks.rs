//! Task endpoints: create, add a file, inspect.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::ErrorResponse;
use crate::schemas::task::{AddFileRequest, FileResponse, TaskResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(create_task, add_file, get_task),
    components(schemas(TaskResponse, FileResponse, AddFileRequest, ErrorResponse))
)]
pub struct TasksApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/task", post(create_task))
        .route("/api/task/{id}", get(get_task))
        .route("/api/task/{id}/add_file", post(add_file))
}

#[utoipa::path(
    post,
    path = "/api/task",
    tag = "tasks",
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 500, description = "Too many active tasks", body = ErrorResponse),
    )
)]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<TaskResponse>), ServerError> {
    let task = state.tasks.create_task().await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Append a file URL. The request that fills the task starts archiving and
/// returns the task as `processing`.
#[utoipa::path(
    post,
    path = "/api/task/{id}/add_file",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    request_body = AddFileRequest,
    responses(
        (status = 200, description = "File added", body = TaskResponse),
        (status = 400, description = "Rejected file or unknown task", body = ErrorResponse),
        (status = 503, description = "Archiver shutting down", body = ErrorResponse),
    )
)]
pub async fn add_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<AddFileRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ServerError> {
    let Json(req) =
        body.map_err(|e| ServerError::BadRequest(format!("invalid body format: {}", e.body_text())))?;
    if req.url.trim().is_empty() {
        return Err(ServerError::BadRequest("url is empty".to_owned()));
    }

    let task = state.tasks.add_file(&id, &req.url).await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    get,
    path = "/api/task/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task retrieved", body = TaskResponse),
        (status = 400, description = "Unknown task", body = ErrorResponse),
    )
)]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ServerError> {
    let task = state.tasks.get_task(&id).await?;
    Ok(Json(task.into()))
}
