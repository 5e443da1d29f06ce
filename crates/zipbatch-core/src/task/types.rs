use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

/// Identifier assigned to a task at creation.
pub type TaskId = Uuid;

/// Lifecycle state of a task.
///
/// Transitions only ever go `Created → Processing → Done | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Accepting files.
    Created,
    /// Full; the archiver owns it.
    Processing,
    /// Archive published.
    Done,
    /// Archive pipeline failed.
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Processing => "processing",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
        }
    }

    /// Active tasks count against the creation ceiling.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Created | TaskStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested file inside a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFile {
    pub url: String,
    /// Why this file is missing from the archive; `None` on success.
    pub error: Option<String>,
}

impl TaskFile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: None,
        }
    }
}

/// Where a finished archive lives. Present only on `Done` tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    /// Path on local disk; never sent to clients.
    pub location: PathBuf,
    /// Public download URL.
    pub url: String,
}

/// Snapshot of a task. The store hands out owned clones only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    pub files: Vec<TaskFile>,
    pub archive: Option<ArchiveRef>,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Created,
            files: Vec::new(),
            archive: None,
        }
    }

    pub fn mark_processing(&mut self) {
        self.status = TaskStatus::Processing;
    }

    pub fn mark_done(&mut self, archive: ArchiveRef) {
        self.status = TaskStatus::Done;
        self.archive = Some(archive);
    }

    pub fn mark_failed(&mut self) {
        self.status = TaskStatus::Error;
        self.archive = None;
    }

    /// Number of files recorded with a fetch or archive error.
    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }
}
