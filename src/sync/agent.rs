// file: src/sync/agent.rs
// description: per-file pull and push synchronization against the hosted repository
// reference: https://docs.github.com/en/rest/repos/contents#create-or-update-file-contents

use crate::error::{BackupError, Result};
use crate::remote::encoding::{decode_text, encode_text};
use crate::remote::{PutFileRequest, RemoteFileSnapshot, RemoteRepoClient, RepositoryHandle};
use crate::sync::decision::{LocalFile, PullAction, PushAction, decide_pull, decide_push};
use crate::sync::path::TrackedFile;
use crate::sync::stats::FileOutcome;
use tracing::{debug, error, info, warn};

/// Dry-run view of what one pass would do to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePlan {
    LocalMissing {
        local_path: String,
    },
    Planned {
        remote_key: String,
        pull: PullAction,
        push: PushAction,
    },
}

pub struct SyncAgent<C> {
    client: C,
    owner: String,
    private: bool,
    commit_prefix: String,
}

impl<C: RemoteRepoClient> SyncAgent<C> {
    pub fn new(client: C, owner: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            private: true,
            commit_prefix: "Backup".to_string(),
        }
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn with_commit_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.commit_prefix = prefix.into();
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Looks the repository up among those owned by the authenticated identity.
    pub async fn find_repo(&self, name: &str) -> Result<Option<RepositoryHandle>> {
        let repositories = self.client.list_owned_repositories().await?;
        Ok(repositories
            .iter()
            .find(|repo| repo.name == name)
            .map(|repo| RepositoryHandle::new(repo.name.clone())))
    }

    pub async fn ensure_repo(&self, name: &str) -> Result<RepositoryHandle> {
        let result = self.find_or_create_repo(name).await;
        if let Err(e) = &result {
            error!("Error ensuring repository {}: {}", name, e);
        }
        result
    }

    async fn find_or_create_repo(&self, name: &str) -> Result<RepositoryHandle> {
        if let Some(existing) = self.find_repo(name).await? {
            info!("Repository {} found", existing);
            return Ok(existing);
        }

        info!("Creating repository {}", name);
        let created = self.client.create_repository(name, self.private).await?;
        info!("Repository {} created", created.name);

        Ok(RepositoryHandle::new(created.name))
    }

    /// Fetches and decodes the remote file, `Ok(None)` when it does not exist.
    pub async fn fetch_file_meta(
        &self,
        repo: &RepositoryHandle,
        remote_path: &str,
    ) -> Result<Option<RemoteFileSnapshot>> {
        let result = self.fetch_snapshot(repo, remote_path).await;
        if let Err(e) = &result {
            error!("Failed to fetch metadata for {}: {}", remote_path, e);
        }
        result
    }

    async fn fetch_snapshot(
        &self,
        repo: &RepositoryHandle,
        remote_path: &str,
    ) -> Result<Option<RemoteFileSnapshot>> {
        let Some(raw) = self
            .client
            .get_file_content(&self.owner, repo.name(), remote_path)
            .await?
        else {
            return Ok(None);
        };

        // Large files come back without an inline body; treating that as empty
        // text would let a pull truncate the local copy.
        if !raw.is_inline_base64() {
            return Err(BackupError::Decode(format!(
                "{} has no inline content (encoding {:?}, {} bytes)",
                remote_path, raw.encoding, raw.size
            )));
        }

        let content = decode_text(&raw.content)?;
        if content.len() as u64 != raw.size {
            return Err(BackupError::Decode(format!(
                "{} decoded to {} bytes but the remote reports {}",
                remote_path,
                content.len(),
                raw.size
            )));
        }

        Ok(Some(RemoteFileSnapshot {
            content,
            content_id: raw.sha,
            size: raw.size,
        }))
    }

    /// Pulls the remote copy over the local file when the remote is larger or differs.
    pub async fn sync_file(&self, repo: &RepositoryHandle, file: &TrackedFile) -> FileOutcome {
        match self.pull(repo, file).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to sync {}: {}", file.local_path().display(), e);
                FileOutcome::Failed(e.to_string())
            }
        }
    }

    /// Pushes the local file when it is new to the remote, larger, or differs.
    pub async fn upload_file_to_repo(
        &self,
        repo: &RepositoryHandle,
        file: &TrackedFile,
    ) -> FileOutcome {
        match self.push(repo, file).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_conflict() => {
                warn!(
                    "Remote {} changed concurrently, upload will be retried next pass",
                    file.remote_key()
                );
                FileOutcome::Failed(e.to_string())
            }
            Err(e) => {
                error!("Failed to upload {}: {}", file.local_path().display(), e);
                FileOutcome::Failed(e.to_string())
            }
        }
    }

    /// Computes both decisions for a file without writing anywhere.
    ///
    /// The push decision is evaluated against the local state the pull step
    /// would leave behind, matching the order of a real pass.
    pub async fn plan_file(&self, repo: &RepositoryHandle, file: &TrackedFile) -> Result<FilePlan> {
        let Some(local) = LocalFile::read(file.local_path()).await? else {
            return Ok(FilePlan::LocalMissing {
                local_path: file.local_path().display().to_string(),
            });
        };

        let remote = self.fetch_file_meta(repo, file.remote_key()).await?;

        let pull = decide_pull(&local, remote.as_ref());
        let after_pull = match (pull, &remote) {
            (PullAction::Overwrite, Some(remote)) => LocalFile::new(remote.content.clone()),
            _ => local,
        };
        let push = decide_push(&after_pull, remote.as_ref());

        Ok(FilePlan::Planned {
            remote_key: file.remote_key().to_string(),
            pull,
            push,
        })
    }

    async fn pull(&self, repo: &RepositoryHandle, file: &TrackedFile) -> Result<FileOutcome> {
        let local_path = file.local_path();
        let Some(local) = LocalFile::read(local_path).await? else {
            warn!("File {} does not exist. Skipping", local_path.display());
            return Ok(FileOutcome::LocalMissing);
        };

        let key = file.remote_key();
        debug!("Checking {} in repository {}", key, repo);
        let remote = self.fetch_file_meta(repo, key).await?;

        match (decide_pull(&local, remote.as_ref()), remote) {
            (PullAction::Overwrite, Some(remote)) => {
                info!("Remote {} is larger or differs, updating local file", key);
                tokio::fs::write(local_path, remote.content.as_bytes())
                    .await
                    .map_err(|e| BackupError::file_operation(local_path, e))?;
                info!("Local file {} updated from {}", local_path.display(), repo);
                Ok(FileOutcome::Pulled)
            }
            (PullAction::UpToDate, _) => {
                debug!("{} is up to date locally", key);
                Ok(FileOutcome::Unchanged)
            }
            _ => {
                info!("{} not found in {}. Skipping pull", key, repo);
                Ok(FileOutcome::RemoteAbsent)
            }
        }
    }

    async fn push(&self, repo: &RepositoryHandle, file: &TrackedFile) -> Result<FileOutcome> {
        let Some(local) = LocalFile::read(file.local_path()).await? else {
            warn!("File {} does not exist. Skipping", file.local_path().display());
            return Ok(FileOutcome::LocalMissing);
        };

        let key = file.remote_key();
        debug!("Checking {} in repository {}", key, repo);
        let remote = self.fetch_file_meta(repo, key).await?;

        let (sha, verb, outcome) = match (decide_push(&local, remote.as_ref()), remote) {
            (PushAction::Create, _) => (None, "Uploading", FileOutcome::Created),
            (PushAction::Update, Some(remote)) => {
                (Some(remote.content_id), "Updating", FileOutcome::Updated)
            }
            _ => {
                debug!("{} is the same locally and remotely. Skipping upload", key);
                return Ok(FileOutcome::Unchanged);
            }
        };

        info!("{} {} to repository {}", verb, key, repo);
        let request = PutFileRequest {
            message: format!("{}: {} {}", self.commit_prefix, verb, key),
            content: encode_text(&local.content),
            path: key.to_string(),
            sha,
        };
        self.client
            .create_or_update_file(&self.owner, repo.name(), &request)
            .await?;
        info!("Successfully wrote {} to repository {}", request.path, repo);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryRemote, RemoteContent, RemoteRepository};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const OWNER: &str = "octocat";
    const REPO: &str = "backup";

    async fn agent_with_repo() -> (SyncAgent<MemoryRemote>, RepositoryHandle) {
        let remote = MemoryRemote::new(OWNER);
        remote.add_repository(REPO).await;
        let agent = SyncAgent::new(remote, OWNER);
        let repo = agent.ensure_repo(REPO).await.unwrap();
        (agent, repo)
    }

    fn tracked(temp: &TempDir, name: &str) -> TrackedFile {
        TrackedFile::new(temp.path().join(name), temp.path()).unwrap()
    }

    /// Serves one fixed contents payload for every path.
    struct FixedContentRemote {
        payload: RemoteContent,
        writes: AtomicUsize,
    }

    impl FixedContentRemote {
        fn new(payload: serde_json::Value) -> Self {
            Self {
                payload: serde_json::from_value(payload).unwrap(),
                writes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteRepoClient for FixedContentRemote {
        async fn list_owned_repositories(&self) -> Result<Vec<RemoteRepository>> {
            Ok(vec![RemoteRepository {
                name: REPO.to_string(),
                private: true,
            }])
        }

        async fn create_repository(&self, name: &str, private: bool) -> Result<RemoteRepository> {
            Ok(RemoteRepository {
                name: name.to_string(),
                private,
            })
        }

        async fn get_file_content(
            &self,
            _owner: &str,
            _repo: &str,
            _path: &str,
        ) -> Result<Option<RemoteContent>> {
            Ok(Some(self.payload.clone()))
        }

        async fn create_or_update_file(
            &self,
            _owner: &str,
            _repo: &str,
            _request: &PutFileRequest,
        ) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ensure_repo_finds_existing() {
        let (agent, repo) = agent_with_repo().await;
        assert_eq!(repo.name(), REPO);
        assert_eq!(agent.client().repositories().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_repo_creates_private() {
        let agent = SyncAgent::new(MemoryRemote::new(OWNER), OWNER);
        let repo = agent.ensure_repo("fresh").await.unwrap();

        assert_eq!(repo.name(), "fresh");
        let repositories = agent.client().repositories().await;
        assert_eq!(repositories.len(), 1);
        assert!(repositories[0].private);
    }

    #[tokio::test]
    async fn test_ensure_repo_propagates_failure() {
        let remote = MemoryRemote::new(OWNER);
        remote.fail_listing().await;
        let agent = SyncAgent::new(remote, OWNER);

        let err = agent.ensure_repo(REPO).await.unwrap_err();
        assert!(matches!(err, BackupError::Api { status: 401, .. }));
        assert!(agent.client().repositories().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_file_meta_absent_and_present() {
        let (agent, repo) = agent_with_repo().await;
        assert!(agent.fetch_file_meta(&repo, "a.txt").await.unwrap().is_none());

        let sha = agent.client().put_file(REPO, "a.txt", "hello").await;
        let snapshot = agent.fetch_file_meta(&repo, "a.txt").await.unwrap().unwrap();
        assert_eq!(
            snapshot,
            RemoteFileSnapshot {
                content_id: sha,
                content: "hello".to_string(),
                size: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_file_meta_propagates_other_errors() {
        let (agent, repo) = agent_with_repo().await;
        agent.client().fail_path("a.txt").await;
        assert!(agent.fetch_file_meta(&repo, "a.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_file_meta_rejects_size_mismatch() {
        let agent = SyncAgent::new(
            FixedContentRemote::new(serde_json::json!({
                "encoding": "base64",
                "size": 50,
                "content": encode_text("hello"),
                "sha": "abc"
            })),
            OWNER,
        );
        let repo = RepositoryHandle::new(REPO);

        let err = agent.fetch_file_meta(&repo, "a.txt").await.unwrap_err();
        assert!(matches!(err, BackupError::Decode(_)));
    }

    #[tokio::test]
    async fn test_large_remote_without_inline_body_leaves_local_intact() {
        let agent = SyncAgent::new(
            FixedContentRemote::new(serde_json::json!({
                "encoding": "none",
                "size": 2_000_000,
                "content": "",
                "sha": "abc"
            })),
            OWNER,
        );
        let repo = agent.ensure_repo(REPO).await.unwrap();
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "big.log");
        let body = "x".repeat(2_000_000);
        fs::write(file.local_path(), &body).unwrap();

        let outcome = agent.sync_file(&repo, &file).await;
        assert!(matches!(outcome, FileOutcome::Failed(_)));
        assert_eq!(fs::read_to_string(file.local_path()).unwrap(), body);

        let outcome = agent.upload_file_to_repo(&repo, &file).await;
        assert!(matches!(outcome, FileOutcome::Failed(_)));
        assert_eq!(agent.client().writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_local_file_makes_no_remote_call() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let missing = tracked(&temp, "gone.txt");
        let calls_before = agent.client().call_count();

        assert_eq!(agent.sync_file(&repo, &missing).await, FileOutcome::LocalMissing);
        assert_eq!(
            agent.upload_file_to_repo(&repo, &missing).await,
            FileOutcome::LocalMissing
        );
        assert_eq!(agent.client().call_count(), calls_before);
    }

    #[tokio::test]
    async fn test_remote_absent_pull_noop_push_creates() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "a.txt");
        fs::write(file.local_path(), "hello").unwrap();

        assert_eq!(agent.sync_file(&repo, &file).await, FileOutcome::RemoteAbsent);
        assert_eq!(fs::read_to_string(file.local_path()).unwrap(), "hello");

        assert_eq!(
            agent.upload_file_to_repo(&repo, &file).await,
            FileOutcome::Created
        );

        let writes = agent.client().writes().await;
        assert_eq!(writes.len(), 1);
        assert!(writes[0].is_create());
        assert_eq!(writes[0].path, "a.txt");
        assert_eq!(writes[0].message, "Backup: Uploading a.txt");
        assert_eq!(
            agent.client().file(REPO, "a.txt").await.as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn test_identical_files_are_not_written() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "same.txt");
        fs::write(file.local_path(), "identical").unwrap();
        agent.client().put_file(REPO, "same.txt", "identical").await;

        assert_eq!(agent.sync_file(&repo, &file).await, FileOutcome::Unchanged);
        assert_eq!(
            agent.upload_file_to_repo(&repo, &file).await,
            FileOutcome::Unchanged
        );
        assert!(agent.client().writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_larger_remote_is_pulled() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "a.txt");
        fs::write(file.local_path(), "hi").unwrap();
        agent.client().put_file(REPO, "a.txt", "hello").await;

        assert_eq!(agent.sync_file(&repo, &file).await, FileOutcome::Pulled);
        assert_eq!(fs::read_to_string(file.local_path()).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_larger_local_updates_with_content_id() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        let file = tracked(&temp, "sub/notes.txt");
        fs::write(file.local_path(), "a much longer local note").unwrap();
        let sha = agent.client().put_file(REPO, "sub/notes.txt", "short").await;

        assert_eq!(
            agent.upload_file_to_repo(&repo, &file).await,
            FileOutcome::Updated
        );

        let writes = agent.client().writes().await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].expected_sha, Some(sha));
        assert_eq!(writes[0].message, "Backup: Updating sub/notes.txt");
        assert_eq!(writes[0].content, "a much longer local note");
    }

    #[tokio::test]
    async fn test_stale_update_fails_without_retry() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "a.txt");
        fs::write(file.local_path(), "a much longer local note").unwrap();
        agent.client().put_file(REPO, "a.txt", "short").await;
        agent.client().commit_after_fetch("a.txt", 1, "theirs").await;
        let calls_before = agent.client().call_count();

        let outcome = agent.upload_file_to_repo(&repo, &file).await;

        match outcome {
            FileOutcome::Failed(message) => assert!(message.contains("changed since it was fetched")),
            other => panic!("expected a failed upload, got {:?}", other),
        }
        // One fetch and one rejected write.
        assert_eq!(agent.client().call_count() - calls_before, 2);
        assert!(agent.client().writes().await.is_empty());
        assert_eq!(
            agent.client().file(REPO, "a.txt").await.as_deref(),
            Some("theirs")
        );
    }

    #[tokio::test]
    async fn test_upload_failure_is_contained() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "a.txt");
        fs::write(file.local_path(), "hello").unwrap();
        agent.client().fail_path("a.txt").await;

        let outcome = agent.upload_file_to_repo(&repo, &file).await;
        assert!(matches!(outcome, FileOutcome::Failed(_)));
        let outcome = agent.sync_file(&repo, &file).await;
        assert!(matches!(outcome, FileOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_custom_commit_prefix() {
        let remote = MemoryRemote::new(OWNER);
        remote.add_repository(REPO).await;
        let agent = SyncAgent::new(remote, OWNER).with_commit_prefix("Sync");
        let repo = agent.ensure_repo(REPO).await.unwrap();
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "a.txt");
        fs::write(file.local_path(), "x").unwrap();

        agent.upload_file_to_repo(&repo, &file).await;
        assert_eq!(agent.client().writes().await[0].message, "Sync: Uploading a.txt");
    }

    #[tokio::test]
    async fn test_plan_file_predicts_pull_then_noop() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let file = tracked(&temp, "a.txt");
        fs::write(file.local_path(), "hi").unwrap();
        agent.client().put_file(REPO, "a.txt", "hello").await;

        let plan = agent.plan_file(&repo, &file).await.unwrap();
        assert_eq!(
            plan,
            FilePlan::Planned {
                remote_key: "a.txt".to_string(),
                pull: PullAction::Overwrite,
                push: PushAction::Unchanged,
            }
        );
        assert_eq!(fs::read_to_string(file.local_path()).unwrap(), "hi");
        assert!(agent.client().writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_plan_file_missing_local() {
        let (agent, repo) = agent_with_repo().await;
        let temp = TempDir::new().unwrap();
        let plan = agent.plan_file(&repo, &tracked(&temp, "nope.txt")).await.unwrap();
        assert!(matches!(plan, FilePlan::LocalMissing { .. }));
    }
}
