pub mod archiver;
pub mod naming;
pub mod pool;


pub use archiver::{ArchiveError, Archiver, archive_path};
pub use pool::{ArchivePool, ArchivePoolHandle};
