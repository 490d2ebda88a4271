// file: src/sync/path.rs
// description: derives the remote key of a tracked file from its local path
// reference: https://doc.rust-lang.org/std/path/

use crate::error::{BackupError, Result};
use std::path::{Component, Path, PathBuf};

/// A local file tracked for synchronization and its remote addressing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    local_path: PathBuf,
    remote_key: String,
}

impl TrackedFile {
    pub fn new(local_path: impl Into<PathBuf>, base_dir: &Path) -> Result<Self> {
        let local_path = local_path.into();
        let remote_key = remote_key(base_dir, &local_path)?;
        Ok(Self {
            local_path,
            remote_key,
        })
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }
}

/// Path of `local` relative to `base_dir`, joined with `/` on every platform.
///
/// The computation is purely lexical so the key for a given local path is the
/// same on every run, whether or not the file currently exists.
pub fn remote_key(base_dir: &Path, local: &Path) -> Result<String> {
    let base = normalize(&absolute(base_dir)?);
    let local = normalize(&absolute(local)?);

    let relative = local.strip_prefix(&base).map_err(|_| {
        BackupError::Validation(format!(
            "{} is outside base directory {}",
            local.display(),
            base.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        let segment = component.as_os_str().to_str().ok_or_else(|| {
            BackupError::Validation(format!("Path is not valid UTF-8: {}", local.display()))
        })?;
        segments.push(segment.replace('\\', "/"));
    }

    if segments.is_empty() {
        return Err(BackupError::Validation(format!(
            "{} is the base directory itself, not a file inside it",
            local.display()
        )));
    }

    Ok(segments.join("/"))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| BackupError::file_operation(path, e))
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_file_uses_forward_slashes() {
        let key = remote_key(Path::new("/data"), Path::new("/data/sub/notes.txt")).unwrap();
        assert_eq!(key, "sub/notes.txt");
    }

    #[test]
    fn test_top_level_file() {
        let key = remote_key(Path::new("/data/"), Path::new("/data/a.txt")).unwrap();
        assert_eq!(key, "a.txt");
    }

    #[test]
    fn test_dot_segments_are_resolved() {
        let key = remote_key(Path::new("/data/./x/.."), Path::new("/data/sub/../b.txt")).unwrap();
        assert_eq!(key, "b.txt");
    }

    #[test]
    fn test_backslashes_become_separators() {
        let key = remote_key(Path::new("/data"), Path::new("/data/win\\style.txt")).unwrap();
        assert_eq!(key, "win/style.txt");
    }

    #[test]
    fn test_outside_base_dir_rejected() {
        let err = remote_key(Path::new("/data"), Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, BackupError::Validation(_)));
    }

    #[test]
    fn test_base_dir_itself_rejected() {
        assert!(remote_key(Path::new("/data"), Path::new("/data")).is_err());
    }

    #[test]
    fn test_relative_paths_share_working_directory() {
        let key = remote_key(Path::new("."), Path::new("./notes/todo.md")).unwrap();
        assert_eq!(key, "notes/todo.md");
    }

    #[test]
    fn test_key_is_stable() {
        let first = TrackedFile::new("/data/sub/notes.txt", Path::new("/data")).unwrap();
        let second = TrackedFile::new("/data/sub/notes.txt", Path::new("/data")).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.remote_key(), "sub/notes.txt");
        assert_eq!(first.local_path(), Path::new("/data/sub/notes.txt"));
    }
}
