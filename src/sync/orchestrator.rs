// file: src/sync/orchestrator.rs
// description: drives repeated sequential pull-then-push passes over the tracked files
// reference: orchestrates the long-running backup loop

use crate::error::Result;
use crate::remote::{RemoteRepoClient, RepositoryHandle};
use crate::sync::agent::SyncAgent;
use crate::sync::path::TrackedFile;
use crate::sync::schedule::{SchedulePolicy, Shutdown};
use crate::sync::stats::PassStats;
use chrono::{Local, TimeDelta};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

pub struct BackupOrchestrator<C> {
    agent: SyncAgent<C>,
    repository: String,
    files: Vec<TrackedFile>,
    policy: SchedulePolicy,
}

impl<C: RemoteRepoClient> BackupOrchestrator<C> {
    pub fn new(
        agent: SyncAgent<C>,
        repository: impl Into<String>,
        files: Vec<TrackedFile>,
    ) -> Self {
        Self {
            agent,
            repository: repository.into(),
            files,
            policy: SchedulePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SchedulePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn agent(&self) -> &SyncAgent<C> {
        &self.agent
    }

    /// Ensures the repository once, then runs passes until the policy's cycle
    /// limit is reached or shutdown fires. Only a repository failure is an error.
    pub async fn start_backup(&self, mut shutdown: Shutdown) -> Result<PassStats> {
        let repo = self.agent.ensure_repo(&self.repository).await.map_err(|e| {
            error!("Backup process terminated: {}", e);
            e
        })?;

        let mut totals = PassStats::new();
        let mut cycle = 0u64;

        while !shutdown.is_triggered() {
            cycle += 1;
            let span = info_span!("pass", cycle, run_id = %Uuid::new_v4());
            let stats = self.run_pass(&repo, &shutdown).instrument(span).await;
            totals.merge(&stats);

            if self.policy.is_final_cycle(cycle) || shutdown.is_triggered() {
                break;
            }

            let delay = self.policy.next_delay();
            if let Ok(delta) = TimeDelta::from_std(delay) {
                info!(
                    "Waiting {}s, next backup pass at {}",
                    delay.as_secs(),
                    (Local::now() + delta).format("%Y-%m-%d %H:%M:%S")
                );
            }

            if !shutdown.sleep(delay).await {
                break;
            }
        }

        info!("Backup stopped after {} pass(es): {}", totals.passes, totals);
        Ok(totals)
    }

    /// One pass: for each tracked file in order, pull then push.
    pub async fn run_pass(&self, repo: &RepositoryHandle, shutdown: &Shutdown) -> PassStats {
        info!("Starting backup pass over {} file(s)", self.files.len());
        let mut stats = PassStats {
            passes: 1,
            ..PassStats::default()
        };

        for file in &self.files {
            if shutdown.is_triggered() {
                warn!("Shutdown requested, ending pass early");
                break;
            }

            let pulled = self.agent.sync_file(repo, file).await;
            stats.record(&pulled);
            let pushed = self.agent.upload_file_to_repo(repo, file).await;
            stats.record(&pushed);
            stats.files_checked += 1;
        }

        if stats.has_failures() {
            warn!("Backup pass finished with failures: {}", stats);
        } else {
            info!("Backup pass complete: {}", stats);
        }
        stats
    }
}
