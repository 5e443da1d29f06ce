//! Archive download endpoint.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio_util::io::ReaderStream;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::ErrorResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(download_archive))]
pub struct ArchiveApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/archive/{id}", get(download_archive))
}

/// Stream a finished archive. Tasks that are not `done` have no archive yet
/// and answer 404.
#[utoipa::path(
    get,
    path = "/archive/{id}",
    tag = "archive",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Zip archive", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 400, description = "Unknown task", body = ErrorResponse),
        (status = 404, description = "Archive not available", body = ErrorResponse),
    )
)]
pub async fn download_archive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let task = state.tasks.get_task(&id).await?;
    let not_found = || ServerError::NotFound("file not found".to_owned());

    let location = task.archive.map(|a| a.location).ok_or_else(not_found)?;
    let file = match tokio::fs::File::open(&location).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.zip\"", task.id),
        ),
        (header::CONTENT_LENGTH, length.to_string()),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
