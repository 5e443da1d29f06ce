//! Task persistence.
//!
//! [`TaskStore`] is the seam between the service/archiver and wherever tasks
//! live. The only implementation is [`InMemoryTaskStore`], which keeps tasks
//! for the lifetime of the process.
//!
//! Trait methods use `impl Future` in their signatures, so no `async-trait`
//! crate is required.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::TaskError;
use crate::task::types::{Task, TaskFile, TaskId};

pub trait TaskStore: Send + Sync + 'static {
    /// Allocate a fresh identifier and insert an empty `created` task.
    fn create(&self) -> impl Future<Output = Task> + Send;

    fn get(&self, id: TaskId) -> impl Future<Output = Result<Task, TaskError>> + Send;

    /// Append a file and return the updated snapshot. Limits are not checked
    /// here; the admission gate does that before calling.
    fn append_file(
        &self,
        id: TaskId,
        file: TaskFile,
    ) -> impl Future<Output = Result<Task, TaskError>> + Send;

    /// Replace the stored snapshot wholesale.
    fn update(&self, task: Task) -> impl Future<Output = Result<Task, TaskError>> + Send;

    /// Number of tasks in `created` or `processing`.
    fn active_count(&self) -> impl Future<Output = usize> + Send;
}

/// Process-lifetime task map.
///
/// A single `tokio::sync::RwLock<HashMap>` guards all tasks: readers run
/// concurrently, writers are exclusive. Only clones leave the lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    inner: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: TaskId) -> TaskError {
    TaskError::NotFound(id.to_string())
}

impl TaskStore for InMemoryTaskStore {
    async fn create(&self) -> Task {
        let mut guard = self.inner.write().await;
        let mut id = Uuid::new_v4();
        // Ids are never reused.
        while guard.contains_key(&id) {
            id = Uuid::new_v4();
        }
        let task = Task::new(id);
        guard.insert(id, task.clone());
        task
    }

    async fn get(&self, id: TaskId) -> Result<Task, TaskError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn append_file(&self, id: TaskId, file: TaskFile) -> Result<Task, TaskError> {
        let mut guard = self.inner.write().await;
        let task = guard.get_mut(&id).ok_or_else(|| not_found(id))?;
        task.files.push(file);
        Ok(task.clone())
    }

    async fn update(&self, task: Task) -> Result<Task, TaskError> {
        let mut guard = self.inner.write().await;
        let slot = guard.get_mut(&task.id).ok_or_else(|| not_found(task.id))?;
        *slot = task;
        Ok(slot.clone())
    }

    async fn active_count(&self) -> usize {
        self.inner
            .read()
            .await
            .values()
            .filter(|t| t.status.is_active())
            .count()
    }
}
