// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{BackupError, Result};
use std::path::Path;

pub struct Validator;

impl Validator {
    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(BackupError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(BackupError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BackupError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    /// GitHub repository names: ASCII letters, digits, `-`, `_` and `.`.
    pub fn validate_repository_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(BackupError::Validation(
                "Repository name cannot be empty".to_string(),
            ));
        }

        if name == "." || name == ".." {
            return Err(BackupError::Validation(format!(
                "Reserved repository name: {}",
                name
            )));
        }

        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(BackupError::Validation(format!(
                "Invalid character {:?} in repository name {}",
                bad, name
            )));
        }

        Ok(())
    }

    pub fn truncate_text(text: &str, max_length: usize) -> String {
        if text.len() <= max_length {
            return text.to_string();
        }

        let mut end = max_length;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}
