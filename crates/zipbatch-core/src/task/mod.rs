pub mod service;
pub mod store;
pub mod types;

pub use service::TaskService;
pub use store::{InMemoryTaskStore, TaskStore};
pub use types::{ArchiveRef, Task, TaskFile, TaskId, TaskStatus};
