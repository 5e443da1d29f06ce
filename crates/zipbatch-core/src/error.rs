use thiserror::Error;

/// Request-level failures returned synchronously by the task service.
///
/// Archive pipeline failures never surface here; they only show up later as
/// `error` status on the task or as per-file error messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// No task with the given identifier exists.
    #[error("task '{0}' not found")]
    NotFound(String),

    /// The active-task ceiling has been reached.
    #[error("maximum number of active tasks ({limit}) reached")]
    CapacityExceeded { limit: usize },

    /// The task reached a terminal state and accepts no more files.
    #[error("task '{0}' is already finalized")]
    TaskAlreadyFinalized(String),

    /// The file URL could not be parsed as an absolute http(s) URL.
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    /// The file URL's path does not end with an allowed extension.
    #[error("unsupported file extension in '{url}'; allowed: {allowed}")]
    UnsupportedExtension { url: String, allowed: String },

    /// The task already holds the maximum number of files.
    #[error("task already holds the maximum of {limit} files")]
    FileLimitExceeded { limit: usize },

    /// The archive pool has shut down and takes no new jobs.
    #[error("archiver is not accepting new jobs")]
    ArchiverUnavailable,
}
