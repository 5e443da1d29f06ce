//! zipbatch-core – task lifecycle and archive assembly.
//!
//! Clients create a task, add file URLs to it, and once the task holds
//! [`ServiceConfig::max_files_per_task`] files it is handed to the
//! [`Archiver`], which downloads every file into a single zip on disk.
//!
//! ```text
//! TaskService ──(admission checks)──▶ TaskStore
//!      │
//!      └──(task full)──▶ ArchivePool ──▶ Archiver ──(update)──▶ TaskStore
//! ```
//!
//! Wiring, as done by the server:
//!
//! ```rust,ignore
//! let store = Arc::new(InMemoryTaskStore::new());
//! let config = Arc::new(ServiceConfig::default());
//! let archiver = Archiver::new(Arc::clone(&store), Arc::clone(&config));
//! let (pool, pool_handle) = ArchivePool::start(archiver);
//! let tasks = TaskService::new(store, pool, config);
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod task;

pub use archive::{ArchiveError, ArchivePool, ArchivePoolHandle, Archiver};
pub use config::ServiceConfig;
pub use error::TaskError;
pub use task::{
    ArchiveRef, InMemoryTaskStore, Task, TaskFile, TaskId, TaskService, TaskStatus, TaskStore,
};
