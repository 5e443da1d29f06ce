use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zipbatch_core::{Task, TaskFile};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddFileRequest {
    /// Absolute http(s) URL of the file to fetch.
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: String,
    /// One of `created`, `processing`, `done`, `error`.
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileResponse>,
    /// Download URL, present once the archive is ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

impl From<TaskFile> for FileResponse {
    fn from(file: TaskFile) -> Self {
        Self {
            url: file.url,
            error: file.error,
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id.to_string(),
            status: task.status.as_str().to_owned(),
            files: task.files.into_iter().map(FileResponse::from).collect(),
            archive: task.archive.map(|a| a.url),
        }
    }
}
