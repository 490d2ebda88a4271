// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod remote;
pub mod sync;
pub mod utils;

pub use config::{BackupConfig, Config, GithubConfig, ScheduleConfig};
pub use error::{BackupError, Result};
pub use remote::{
    GithubClient, MemoryRemote, RemoteFileSnapshot, RemoteRepoClient, RepositoryHandle,
};
pub use sync::{
    BackupOrchestrator, FileOutcome, FilePlan, PassStats, SchedulePolicy, Shutdown, SyncAgent,
    TrackedFile, shutdown_channel,
};
pub use utils::Validator;
