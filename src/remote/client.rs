// file: src/remote/client.rs
// description: hosted repository API abstraction and shared remote data types
// reference: https://docs.github.com/en/rest/repos/contents

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A repository as listed or created by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    #[serde(default)]
    pub private: bool,
}

/// Raw content record returned by the contents endpoint.
///
/// `content` is base64 in transport form and may contain line breaks. Files
/// above 1 MB come back with `encoding: "none"` and an empty `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteContent {
    pub sha: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub content: String,
    pub size: u64,
}

impl RemoteContent {
    pub const BASE64: &'static str = "base64";

    pub fn is_inline_base64(&self) -> bool {
        self.encoding == Self::BASE64
    }
}

/// Body of a create-or-update request against the contents endpoint.
///
/// A request without `sha` is a create; with `sha` it is an update guarded by
/// the expected current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutFileRequest {
    #[serde(skip)]
    pub path: String,
    pub message: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl PutFileRequest {
    pub fn is_create(&self) -> bool {
        self.sha.is_none()
    }
}

/// Name of the confirmed destination repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    name: String,
}

impl RepositoryHandle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Decoded view of a remote file, fetched fresh on every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileSnapshot {
    pub content_id: String,
    pub content: String,
    pub size: u64,
}

/// Operations the sync agent needs from the code-hosting service.
///
/// Every call is a network suspension point; implementations must not retry.
#[async_trait]
pub trait RemoteRepoClient: Send + Sync {
    /// Repositories owned by the authenticated identity.
    async fn list_owned_repositories(&self) -> Result<Vec<RemoteRepository>>;

    async fn create_repository(&self, name: &str, private: bool) -> Result<RemoteRepository>;

    /// `Ok(None)` when the path does not exist remotely.
    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<RemoteContent>>;

    /// Fails with `BackupError::Conflict` when `request.sha` is stale.
    async fn create_or_update_file(
        &self,
        owner: &str,
        repo: &str,
        request: &PutFileRequest,
    ) -> Result<()>;
}
