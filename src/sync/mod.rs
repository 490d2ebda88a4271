// file: src/sync/mod.rs
// description: two-way file synchronization module exports
// reference: internal module structure

pub mod agent;
pub mod decision;
pub mod orchestrator;
pub mod path;
pub mod schedule;
pub mod stats;

pub use agent::{FilePlan, SyncAgent};
pub use decision::{LocalFile, PullAction, PushAction};
pub use orchestrator::BackupOrchestrator;
pub use path::{TrackedFile, remote_key};
pub use schedule::{SchedulePolicy, Shutdown, ShutdownTrigger, shutdown_channel};
pub use stats::{FileOutcome, PassStats};
