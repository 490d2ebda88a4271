// file: src/remote/memory.rs
// description: in-memory hosted repository used to drive the sync agent without network access
// reference: mirrors the GitHub contents API semantics (404 on absent, 409 on stale sha)

use crate::error::{BackupError, Result};
use crate::remote::client::{PutFileRequest, RemoteContent, RemoteRepoClient, RemoteRepository};
use crate::remote::encoding::{decode_text, encode_text};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredFile {
    sha: String,
    content: String,
}

/// A write request as received by the remote, with the body already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub repo: String,
    pub path: String,
    pub message: String,
    pub content: String,
    pub expected_sha: Option<String>,
}

impl RecordedWrite {
    pub fn is_create(&self) -> bool {
        self.expected_sha.is_none()
    }
}

/// An in-memory implementation of `RemoteRepoClient` for a single owner.
pub struct MemoryRemote {
    owner: String,
    repositories: RwLock<Vec<RemoteRepository>>,
    files: RwLock<HashMap<(String, String), StoredFile>>,
    writes: RwLock<Vec<RecordedWrite>>,
    failing_paths: RwLock<HashSet<String>>,
    fail_listing: RwLock<bool>,
    pending_commits: RwLock<HashMap<String, PendingCommit>>,
    calls: AtomicUsize,
}

#[derive(Debug, Clone)]
struct PendingCommit {
    fetches_left: usize,
    content: String,
}

impl MemoryRemote {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repositories: RwLock::new(Vec::new()),
            files: RwLock::new(HashMap::new()),
            writes: RwLock::new(Vec::new()),
            failing_paths: RwLock::new(HashSet::new()),
            fail_listing: RwLock::new(false),
            pending_commits: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn add_repository(&self, name: &str) {
        self.repositories.write().await.push(RemoteRepository {
            name: name.to_string(),
            private: true,
        });
    }

    /// Seeds a remote file without recording a write. Returns its sha.
    pub async fn put_file(&self, repo: &str, path: &str, content: &str) -> String {
        let sha = new_sha();
        self.files.write().await.insert(
            (repo.to_string(), path.to_string()),
            StoredFile {
                sha: sha.clone(),
                content: content.to_string(),
            },
        );
        sha
    }

    pub async fn file(&self, repo: &str, path: &str) -> Option<String> {
        self.files
            .read()
            .await
            .get(&(repo.to_string(), path.to_string()))
            .map(|file| file.content.clone())
    }

    pub async fn repositories(&self) -> Vec<RemoteRepository> {
        self.repositories.read().await.clone()
    }

    pub async fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().await.clone()
    }

    /// Every request touching `path` fails with a server error.
    pub async fn fail_path(&self, path: &str) {
        self.failing_paths.write().await.insert(path.to_string());
    }

    pub async fn fail_listing(&self) {
        *self.fail_listing.write().await = true;
    }

    /// Another writer commits `content` to `path` right after the `fetch`-th
    /// read of it (1-based), so a write based on that read carries a stale sha.
    pub async fn commit_after_fetch(&self, path: &str, fetch: usize, content: &str) {
        self.pending_commits.write().await.insert(
            path.to_string(),
            PendingCommit {
                fetches_left: fetch,
                content: content.to_string(),
            },
        );
    }

    async fn apply_pending_commit(&self, repo: &str, path: &str) {
        let mut pending = self.pending_commits.write().await;
        let Some(commit) = pending.get_mut(path) else {
            return;
        };

        commit.fetches_left = commit.fetches_left.saturating_sub(1);
        if commit.fetches_left == 0 {
            let content = commit.content.clone();
            pending.remove(path);
            drop(pending);
            self.put_file(repo, path, &content).await;
        }
    }

    /// Total number of API calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn check_target(&self, owner: &str, repo: &str, path: &str) -> Result<()> {
        if self.failing_paths.read().await.contains(path) {
            return Err(BackupError::Api {
                status: 500,
                message: format!("injected failure for {}", path),
            });
        }

        let repo_exists = self.repositories.read().await.iter().any(|r| r.name == repo);
        if owner != self.owner || !repo_exists {
            return Err(BackupError::Api {
                status: 404,
                message: format!("repository {}/{} not found", owner, repo),
            });
        }

        Ok(())
    }
}

fn new_sha() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl RemoteRepoClient for MemoryRemote {
    async fn list_owned_repositories(&self) -> Result<Vec<RemoteRepository>> {
        self.record_call();
        if *self.fail_listing.read().await {
            return Err(BackupError::Api {
                status: 401,
                message: "Bad credentials".to_string(),
            });
        }
        Ok(self.repositories.read().await.clone())
    }

    async fn create_repository(&self, name: &str, private: bool) -> Result<RemoteRepository> {
        self.record_call();
        let mut repositories = self.repositories.write().await;
        if repositories.iter().any(|r| r.name == name) {
            return Err(BackupError::Api {
                status: 422,
                message: "name already exists on this account".to_string(),
            });
        }

        let repository = RemoteRepository {
            name: name.to_string(),
            private,
        };
        repositories.push(repository.clone());
        Ok(repository)
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<RemoteContent>> {
        self.record_call();
        if self.failing_paths.read().await.contains(path) {
            return Err(BackupError::Api {
                status: 500,
                message: format!("injected failure for {}", path),
            });
        }
        if owner != self.owner {
            return Ok(None);
        }

        let content = self
            .files
            .read()
            .await
            .get(&(repo.to_string(), path.to_string()))
            .map(|file| RemoteContent {
                sha: file.sha.clone(),
                encoding: RemoteContent::BASE64.to_string(),
                content: encode_text(&file.content),
                size: file.content.len() as u64,
            });

        self.apply_pending_commit(repo, path).await;
        Ok(content)
    }

    async fn create_or_update_file(
        &self,
        owner: &str,
        repo: &str,
        request: &PutFileRequest,
    ) -> Result<()> {
        self.record_call();
        self.check_target(owner, repo, &request.path).await?;

        let content = decode_text(&request.content)?;
        let key = (repo.to_string(), request.path.clone());
        let mut files = self.files.write().await;

        let current_sha = files.get(&key).map(|file| file.sha.as_str());
        if current_sha != request.sha.as_deref() {
            return Err(BackupError::Conflict(request.path.clone()));
        }

        files.insert(
            key,
            StoredFile {
                sha: new_sha(),
                content: content.clone(),
            },
        );

        self.writes.write().await.push(RecordedWrite {
            repo: repo.to_string(),
            path: request.path.clone(),
            message: request.message.clone(),
            content,
            expected_sha: request.sha.clone(),
        });

        Ok(())
    }
}
