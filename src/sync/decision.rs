// file: src/sync/decision.rs
// description: pull and push predicates comparing local and remote file state
// reference: size-or-content comparison, no merge

use crate::error::{BackupError, Result};
use crate::remote::RemoteFileSnapshot;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

/// Local file contents and on-disk size at the time of the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub content: String,
    pub size: u64,
}

impl LocalFile {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        Self { content, size }
    }

    /// `Ok(None)` when nothing exists at `path`. Non-UTF-8 content is an error.
    pub async fn read(path: &Path) -> Result<Option<Self>> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackupError::file_operation(path, e)),
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BackupError::file_operation(path, e))?;

        Ok(Some(Self {
            content,
            size: metadata.len(),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullAction {
    RemoteAbsent,
    Overwrite,
    UpToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAction {
    Create,
    Update,
    Unchanged,
}

impl fmt::Display for PullAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteAbsent => write!(f, "skip (not on remote)"),
            Self::Overwrite => write!(f, "pull remote over local"),
            Self::UpToDate => write!(f, "up to date"),
        }
    }
}

impl fmt::Display for PushAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create on remote"),
            Self::Update => write!(f, "update remote"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Remote wins when it is strictly larger or its text differs at all.
pub fn should_pull(local: &LocalFile, remote: &RemoteFileSnapshot) -> bool {
    remote.size > local.size || remote.content != local.content
}

/// Local wins when it is strictly larger or its text differs at all.
pub fn should_push(local: &LocalFile, remote: &RemoteFileSnapshot) -> bool {
    local.size > remote.size || local.content != remote.content
}

pub fn decide_pull(local: &LocalFile, remote: Option<&RemoteFileSnapshot>) -> PullAction {
    match remote {
        None => PullAction::RemoteAbsent,
        Some(remote) if should_pull(local, remote) => PullAction::Overwrite,
        Some(_) => PullAction::UpToDate,
    }
}

pub fn decide_push(local: &LocalFile, remote: Option<&RemoteFileSnapshot>) -> PushAction {
    match remote {
        None => PushAction::Create,
        Some(remote) if should_push(local, remote) => PushAction::Update,
        Some(_) => PushAction::Unchanged,
    }
}
