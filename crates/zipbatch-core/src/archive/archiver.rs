//! Turns a full task into a zip archive on disk.
//!
//! The zip writer and file I/O are synchronous, so the whole build runs on a
//! `spawn_blocking` thread using `reqwest::blocking`. Response bodies are
//! copied straight into the zip entry without being buffered in memory.
//!
//! The archiver only ever touches its own copy of the task. The final state,
//! `done` or `error`, is published through [`TaskStore::update`] on every path.

use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::naming::{EntryNames, entry_name};
use crate::config::ServiceConfig;
use crate::task::store::TaskStore;
use crate::task::types::{ArchiveRef, Task, TaskId};

/// Task-level failures of the archive pipeline.
///
/// These never reach a caller; they are logged and collapse into `error`
/// status on the task.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to create temporary archive in {path}: {source}")]
    TempFile { path: PathBuf, source: io::Error },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to finalize zip archive: {0}")]
    Finish(#[from] zip::result::ZipError),

    #[error("failed to flush temporary archive: {0}")]
    Flush(io::Error),

    #[error("failed to publish archive to {path}: {source}")]
    Publish { path: PathBuf, source: io::Error },

    #[error("archive worker panicked: {0}")]
    Panicked(String),
}

/// Final path of a task's archive inside `dir`.
pub fn archive_path(dir: &Path, task_id: TaskId) -> PathBuf {
    dir.join(format!("{task_id}.zip"))
}

/// Fetch every file of `task` into a zip under `dir` and return the final
/// archive path. Per-file failures are recorded on `task.files` and do not
/// fail the build.
fn build_archive(task: &mut Task, dir: &Path, timeout: Duration) -> Result<PathBuf, ArchiveError> {
    fs::create_dir_all(dir).map_err(|source| ArchiveError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    // Removed on drop unless persisted below.
    let temp = tempfile::Builder::new()
        .prefix(&format!("{}_", task.id))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|source| ArchiveError::TempFile {
            path: dir.to_path_buf(),
            source,
        })?;
    let mut zip = ZipWriter::new(BufWriter::new(temp));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("zipbatch/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;

    let task_id = task.id;
    let mut names = EntryNames::new();
    for (index, entry) in task.files.iter_mut().enumerate() {
        let name = names.claim(entry_name(&entry.url, index));

        let mut response = match client.get(&entry.url).send() {
            Ok(r) => r,
            Err(e) => {
                warn!(task_id = %task_id, url = %entry.url, error = %e, "download failed");
                entry.error = Some(format!("download error: {e}"));
                continue;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(task_id = %task_id, url = %entry.url, status = status.as_u16(), "download returned non-success status");
            entry.error = Some(format!("HTTP status {}", status.as_u16()));
            continue;
        }

        if let Err(e) = zip.start_file(name.as_str(), options) {
            warn!(task_id = %task_id, entry = %name, error = %e, "zip entry creation failed");
            entry.error = Some(format!("zip create error: {e}"));
            continue;
        }

        if let Err(e) = io::copy(&mut response, &mut zip) {
            warn!(task_id = %task_id, entry = %name, error = %e, "streaming into zip failed");
            entry.error = Some(format!("zip write error: {e}"));
            // Drop the half-written entry so the archive only holds complete files.
            if let Err(abort) = zip.abort_file() {
                warn!(task_id = %task_id, entry = %name, error = %abort, "failed to discard partial zip entry");
            }
        }
    }

    let writer = zip.finish()?;
    let temp = writer
        .into_inner()
        .map_err(|e| ArchiveError::Flush(e.into_error()))?;
    temp.as_file().sync_all().map_err(ArchiveError::Flush)?;

    let final_path = archive_path(dir, task_id);
    temp.persist(&final_path).map_err(|e| ArchiveError::Publish {
        path: final_path.clone(),
        source: e.error,
    })?;
    Ok(final_path)
}

/// Runs the archive pipeline for one task and publishes the outcome.
#[derive(Debug)]
pub struct Archiver<S> {
    store: Arc<S>,
    config: Arc<ServiceConfig>,
}

impl<S: TaskStore> Archiver<S> {
    pub fn new(store: Arc<S>, config: Arc<ServiceConfig>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Build the archive for `task` and persist its terminal state.
    ///
    /// `task` is the archiver's private snapshot; the stored copy is only
    /// changed through [`TaskStore::update`]. Returns what was published.
    pub async fn run(&self, mut task: Task) -> Task {
        task.mark_processing();
        let task_id = task.id;
        let dir = self.config.archive_directory.clone();
        let timeout = self.config.fetch_timeout;
        let fallback = task.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let result = build_archive(&mut task, &dir, timeout);
            (task, result)
        })
        .await;

        let (mut task, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => (fallback, Err(ArchiveError::Panicked(e.to_string()))),
        };

        match result {
            Ok(location) => {
                let url = self.config.archive_url(&task_id);
                info!(
                    task_id = %task_id,
                    files = task.files.len(),
                    failed = task.failed_files(),
                    path = %location.display(),
                    "archive ready"
                );
                task.mark_done(ArchiveRef { location, url });
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "archive pipeline failed");
                task.mark_failed();
            }
        }

        self.publish(task).await
    }

    /// Persist `error` for a task whose job will never run.
    pub async fn abandon(&self, mut task: Task) -> Task {
        warn!(task_id = %task.id, "archive job abandoned before start");
        task.mark_failed();
        self.publish(task).await
    }

    async fn publish(&self, task: Task) -> Task {
        match self.store.update(task.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "failed to publish archive result");
                task
            }
        }
    }
}
