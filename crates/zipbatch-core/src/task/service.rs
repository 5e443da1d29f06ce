//! Task service: admission rules in front of the store, plus the archive
//! trigger.
//!
//! Every state-changing call goes through an admission lock held across the
//! checks and the mutation they guard. Concurrent callers therefore cannot
//! overshoot the active-task ceiling or the per-task file limit, and the
//! archive trigger fires exactly once per task.

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::archive::naming::decoded_path;
use crate::archive::pool::ArchivePool;
use crate::config::ServiceConfig;
use crate::error::TaskError;
use crate::task::store::TaskStore;
use crate::task::types::{Task, TaskFile, TaskId, TaskStatus};

#[derive(Debug)]
pub struct TaskService<S> {
    store: Arc<S>,
    archives: ArchivePool<S>,
    config: Arc<ServiceConfig>,
    admission: Mutex<()>,
}

impl<S: TaskStore> TaskService<S> {
    pub fn new(store: Arc<S>, archives: ArchivePool<S>, config: Arc<ServiceConfig>) -> Self {
        Self {
            store,
            archives,
            config,
            admission: Mutex::new(()),
        }
    }

    /// Create an empty task unless the active-task ceiling is reached.
    pub async fn create_task(&self) -> Result<Task, TaskError> {
        let _admission = self.admission.lock().await;

        let active = self.store.active_count().await;
        if active >= self.config.max_active_tasks {
            return Err(TaskError::CapacityExceeded {
                limit: self.config.max_active_tasks,
            });
        }

        let task = self.store.create().await;
        info!(task_id = %task.id, active = active + 1, "task created");
        Ok(task)
    }

    /// Validate and append `url` to the task. Appending the last allowed file
    /// hands the task to the archiver and returns it as `processing`.
    pub async fn add_file(&self, task_id: &str, url: &str) -> Result<Task, TaskError> {
        let id = parse_task_id(task_id)?;
        let _admission = self.admission.lock().await;

        let task = self.store.get(id).await?;
        if matches!(task.status, TaskStatus::Done | TaskStatus::Error) {
            return Err(TaskError::TaskAlreadyFinalized(task_id.to_owned()));
        }

        let parsed = parse_file_url(url)?;
        let path = decoded_path(&parsed).ok_or_else(|| TaskError::InvalidUrl(url.to_owned()))?;
        if !self.config.is_allowed_path(&path) {
            return Err(TaskError::UnsupportedExtension {
                url: url.to_owned(),
                allowed: self.config.allowed_extensions.join(", "),
            });
        }

        let limit = self.config.max_files_per_task;
        if task.files.len() >= limit {
            return Err(TaskError::FileLimitExceeded { limit });
        }

        let fills_task = task.files.len() + 1 == limit;
        if fills_task && !self.archives.is_accepting() {
            return Err(TaskError::ArchiverUnavailable);
        }

        let task = self.store.append_file(id, TaskFile::new(url)).await?;
        debug!(task_id = %id, files = task.files.len(), limit, "file added");

        if fills_task {
            info!(task_id = %id, "task full; submitting for archiving");
            return self.archives.submit(task).await;
        }
        Ok(task)
    }

    /// `false` once the archive pool has begun shutting down; full tasks are
    /// refused from then on.
    pub fn is_archiving(&self) -> bool {
        self.archives.is_accepting()
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, TaskError> {
        self.store.get(parse_task_id(task_id)?).await
    }
}

/// Unparseable identifiers cannot name a stored task.
fn parse_task_id(raw: &str) -> Result<TaskId, TaskError> {
    TaskId::parse_str(raw).map_err(|_| TaskError::NotFound(raw.to_owned()))
}

fn parse_file_url(raw: &str) -> Result<Url, TaskError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(TaskError::InvalidUrl(raw.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::archiver::Archiver;
    use crate::archive::pool::ArchivePoolHandle;
    use crate::task::store::InMemoryTaskStore;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn service_with(config: ServiceConfig) -> (TaskService<InMemoryTaskStore>, ArchivePoolHandle) {
        let store = Arc::new(InMemoryTaskStore::new());
        let config = Arc::new(config);
        let archiver = Archiver::new(Arc::clone(&store), Arc::clone(&config));
        let (pool, handle) = ArchivePool::start(archiver);
        (TaskService::new(store, pool, config), handle)
    }

    fn config() -> ServiceConfig {
        ServiceConfig {
            max_active_tasks: 2,
            max_files_per_task: 3,
            allowed_extensions: vec![".pdf".into(), ".zip".into()],
            archive_directory: std::env::temp_dir()
                .join(format!("zipbatch-service-{}", uuid::Uuid::new_v4())),
            // Nothing listens here, so any triggered fetch fails fast.
            fetch_timeout: Duration::from_secs(2),
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn create_respects_active_ceiling() {
        let (service, _handle) = service_with(config());

        service.create_task().await.expect("first task");
        service.create_task().await.expect("second task");
        assert_eq!(
            service.create_task().await,
            Err(TaskError::CapacityExceeded { limit: 2 })
        );
    }

    #[tokio::test]
    async fn unknown_or_malformed_ids_are_not_found() {
        let (service, _handle) = service_with(config());

        let missing = uuid::Uuid::new_v4().to_string();
        assert!(matches!(
            service.get_task(&missing).await,
            Err(TaskError::NotFound(_))
        ));
        assert!(matches!(
            service.add_file("not-a-uuid", "https://x/y.pdf").await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn extension_allow_list_is_enforced() {
        let (service, _handle) = service_with(config());
        let task = service.create_task().await.unwrap();
        let id = task.id.to_string();

        assert!(matches!(
            service.add_file(&id, "https://x/y.exe").await,
            Err(TaskError::UnsupportedExtension { .. })
        ));
        let updated = service.add_file(&id, "https://x/y.pdf").await.unwrap();
        assert_eq!(updated.files.len(), 1);
        assert_eq!(updated.status, TaskStatus::Created);
    }

    #[tokio::test]
    async fn query_and_fragment_do_not_count_as_extension() {
        let (service, _handle) = service_with(config());
        let id = service.create_task().await.unwrap().id.to_string();

        service
            .add_file(&id, "https://x/y.pdf?download=1#page=2")
            .await
            .expect("path ends with .pdf");
        assert!(matches!(
            service.add_file(&id, "https://x/y.exe?name=z.pdf").await,
            Err(TaskError::UnsupportedExtension { .. })
        ));
    }

    #[tokio::test]
    async fn extension_is_checked_on_the_decoded_path() {
        let (service, _handle) = service_with(config());
        let id = service.create_task().await.unwrap().id.to_string();

        let task = service
            .add_file(&id, "https://x/Annual%20Report%2Epdf")
            .await
            .expect("decoded path ends with .pdf");
        assert_eq!(task.files[0].url, "https://x/Annual%20Report%2Epdf");

        assert!(matches!(
            service.add_file(&id, "https://x/setup.pdf%2Eexe").await,
            Err(TaskError::UnsupportedExtension { .. })
        ));
        assert_eq!(
            service.add_file(&id, "https://x/bad%FF.pdf").await,
            Err(TaskError::InvalidUrl("https://x/bad%FF.pdf".to_owned()))
        );
    }

    #[tokio::test]
    async fn invalid_urls_are_rejected() {
        let (service, _handle) = service_with(config());
        let id = service.create_task().await.unwrap().id.to_string();

        for bad in ["", "report.pdf", "ftp://x/y.pdf", "http://[::1/y.pdf"] {
            assert_eq!(
                service.add_file(&id, bad).await,
                Err(TaskError::InvalidUrl(bad.to_owned())),
                "{bad:?} should be invalid"
            );
        }
        assert!(service.get_task(&id).await.unwrap().files.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[traced_test]
    async fn last_file_triggers_processing() {
        let (service, _handle) = service_with(config());
        let id = service.create_task().await.unwrap().id.to_string();

        service.add_file(&id, "http://127.0.0.1:9/a.pdf").await.unwrap();
        service.add_file(&id, "http://127.0.0.1:9/b.pdf").await.unwrap();
        let full = service.add_file(&id, "http://127.0.0.1:9/c.pdf").await.unwrap();

        assert_eq!(full.status, TaskStatus::Processing);
        assert_eq!(full.files.len(), 3);
        assert!(logs_contain("task full; submitting for archiving"));

        let err = service.add_file(&id, "http://127.0.0.1:9/d.pdf").await;
        assert!(matches!(
            err,
            Err(TaskError::FileLimitExceeded { limit: 3 }) | Err(TaskError::TaskAlreadyFinalized(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn finalized_tasks_reject_files() {
        let (service, _handle) = service_with(config());
        let task = service.create_task().await.unwrap();

        let mut failed = task.clone();
        failed.mark_failed();
        service.store.update(failed).await.unwrap();

        assert_eq!(
            service.add_file(&task.id.to_string(), "https://x/y.pdf").await,
            Err(TaskError::TaskAlreadyFinalized(task.id.to_string()))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_never_exceed_limit() {
        let (service, _handle) = service_with(ServiceConfig {
            max_files_per_task: 5,
            ..config()
        });
        let service = Arc::new(service);
        let id = service.create_task().await.unwrap().id.to_string();

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = Arc::clone(&service);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                service
                    .add_file(&id, &format!("http://127.0.0.1:9/{i}.pdf"))
                    .await
            }));
        }

        let mut accepted = 0;
        let mut processing_returned = 0;
        for h in handles {
            if let Ok(task) = h.await.unwrap() {
                accepted += 1;
                if task.status == TaskStatus::Processing {
                    processing_returned += 1;
                }
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(processing_returned, 1, "archive must trigger exactly once");
        assert_eq!(service.get_task(&id).await.unwrap().files.len(), 5);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let (service, handle) = service_with(ServiceConfig {
            max_files_per_task: 1,
            ..config()
        });
        assert!(service.is_archiving());
        handle.shutdown(Duration::from_millis(10)).await;
        assert!(!service.is_archiving());

        let id = service.create_task().await.unwrap().id.to_string();
        assert_eq!(
            service.add_file(&id, "https://x/y.pdf").await,
            Err(TaskError::ArchiverUnavailable)
        );
        let task = service.get_task(&id).await.unwrap();
        assert!(task.files.is_empty());
        assert_eq!(task.status, TaskStatus::Created);
    }
}
