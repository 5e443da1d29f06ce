//! Limits and locations the task service and archiver operate under.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings consumed by [`crate::TaskService`] and [`crate::Archiver`].
///
/// The server builds this from its own configuration layer; tests construct it
/// directly, usually starting from [`ServiceConfig::default`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Ceiling on tasks in `created` or `processing`, checked at creation.
    pub max_active_tasks: usize,

    /// Number of files that fills a task and starts archiving it.
    pub max_files_per_task: usize,

    /// Path suffixes (e.g. `".pdf"`) a file URL must end with.
    pub allowed_extensions: Vec<String>,

    /// Directory receiving temporary and finished archives.
    pub archive_directory: PathBuf,

    /// Base under which archives are reachable, e.g. `"http://localhost:8080"`.
    pub public_base_url: String,

    /// Per-file fetch timeout, covering connect and body transfer.
    pub fetch_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_active_tasks: 3,
            max_files_per_task: 3,
            allowed_extensions: vec![".pdf".to_owned(), ".jpeg".to_owned(), ".jpg".to_owned()],
            archive_directory: PathBuf::from("./archives"),
            public_base_url: "http://localhost:8080".to_owned(),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl ServiceConfig {
    /// `true` when `path` ends with one of the allowed extensions.
    pub fn is_allowed_path(&self, path: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|ext| !ext.is_empty() && path.ends_with(ext.as_str()))
    }

    /// Externally reachable download URL for a finished archive.
    pub fn archive_url(&self, task_id: &uuid::Uuid) -> String {
        format!(
            "{}/archive/{}",
            self.public_base_url.trim_end_matches('/'),
            task_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_match_is_exact() {
        let cfg = ServiceConfig {
            allowed_extensions: vec![".pdf".into(), ".zip".into()],
            ..ServiceConfig::default()
        };
        assert!(cfg.is_allowed_path("/docs/report.pdf"));
        assert!(cfg.is_allowed_path("/bundle.zip"));
        assert!(!cfg.is_allowed_path("/setup.exe"));
        assert!(!cfg.is_allowed_path("/report.PDF"));
        assert!(!cfg.is_allowed_path("/report.pdf.exe"));
    }

    #[test]
    fn empty_extension_never_matches() {
        let cfg = ServiceConfig {
            allowed_extensions: vec![String::new()],
            ..ServiceConfig::default()
        };
        assert!(!cfg.is_allowed_path("/anything"));
    }

    #[test]
    fn archive_url_strips_trailing_slash() {
        let cfg = ServiceConfig {
            public_base_url: "http://files.local:9000/".into(),
            ..ServiceConfig::default()
        };
        let id = uuid::Uuid::nil();
        assert_eq!(
            cfg.archive_url(&id),
            "http://files.local:9000/archive/00000000-0000-0000-0000-000000000000"
        );
    }
}
