// file: src/sync/stats.rs
// description: per-pass outcome counters for pull and push steps

use std::fmt;

/// Result of a single pull or push step for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Pulled,
    Created,
    Updated,
    Unchanged,
    RemoteAbsent,
    LocalMissing,
    Failed(String),
}

/// Step counts for one or more passes. Each file contributes two steps per pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    pub passes: u64,
    pub files_checked: usize,
    pub pulled: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub remote_absent: usize,
    pub local_missing: usize,
    pub failed: usize,
}

impl PassStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Pulled => self.pulled += 1,
            FileOutcome::Created => self.created += 1,
            FileOutcome::Updated => self.updated += 1,
            FileOutcome::Unchanged => self.unchanged += 1,
            FileOutcome::RemoteAbsent => self.remote_absent += 1,
            FileOutcome::LocalMissing => self.local_missing += 1,
            FileOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &PassStats) {
        self.passes += other.passes;
        self.files_checked += other.files_checked;
        self.pulled += other.pulled;
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.remote_absent += other.remote_absent;
        self.local_missing += other.local_missing;
        self.failed += other.failed;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} pulled, {} created, {} updated, {} unchanged, {} missing locally, {} failed",
            self.files_checked,
            self.pulled,
            self.created,
            self.updated,
            self.unchanged,
            self.local_missing,
            self.failed
        )
    }
}
