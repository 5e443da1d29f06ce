//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use zipbatch_core::{ArchivePool, ArchivePoolHandle, Archiver, InMemoryTaskStore, TaskService};

use crate::config::Config;

#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (file + env derived).
    pub config: Arc<Config>,
    pub tasks: Arc<TaskService<InMemoryTaskStore>>,
}

impl AppState {
    /// Wire the store, archive pool and task service from `config`.
    ///
    /// Must be called inside a tokio runtime. The returned handle drains the
    /// archive pool at shutdown.
    pub fn new(config: Config) -> (Self, ArchivePoolHandle) {
        let service_config = Arc::new(config.service_config());
        let store = Arc::new(InMemoryTaskStore::new());
        let archiver = Archiver::new(Arc::clone(&store), Arc::clone(&service_config));
        let (pool, handle) = ArchivePool::start(archiver);

        let state = Self {
            config: Arc::new(config),
            tasks: Arc::new(TaskService::new(store, pool, service_config)),
        };
        (state, handle)
    }
}
