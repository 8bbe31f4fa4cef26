pub mod archive;
pub mod config;
pub mod digest;
pub mod index;
pub mod layout;
pub mod lock;
pub mod manifest;
pub mod path_safety;
pub mod query;
pub mod report;
pub mod retention;
pub mod verify;
pub mod writer;

pub use archive::{run_archive, run_archive_locked};
pub use config::{ArchiveConfig, ArchiveRequest, RetentionPolicy};
pub use query::{run_query, Query, QueryReport};
pub use report::ArchiveReport;
pub use verify::{verify_snapshot, VerifyReport};
