// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{BackupError, Result};
use crate::sync::TrackedFile;
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "GH_BACKUP";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub github: GithubConfig,
    pub backup: BackupConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    pub repository: String,
    pub base_dir: PathBuf,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default = "default_private")]
    pub private: bool,
    #[serde(default = "default_commit_prefix")]
    pub commit_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub jitter_secs: u64,
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            jitter_secs: 0,
            max_cycles: None,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_secs(self.jitter_secs)
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    "gh_backup".to_string()
}

fn default_private() -> bool {
    true
}

fn default_commit_prefix() -> String {
    "Backup".to_string()
}

fn default_interval_secs() -> u64 {
    3600
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("backup.files")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| BackupError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| BackupError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            github: GithubConfig {
                owner: String::new(),
                token: String::new(),
                api_url: default_api_url(),
                user_agent: default_user_agent(),
            },
            backup: BackupConfig {
                repository: "file-backup".to_string(),
                base_dir: PathBuf::from("."),
                files: vec![],
                private: true,
                commit_prefix: default_commit_prefix(),
            },
            schedule: ScheduleConfig::default(),
        }
    }

    /// Tracked files in configured order. Relative entries resolve against
    /// `base_dir`; an entry outside `base_dir` has no remote key and is rejected.
    pub fn tracked_files(&self) -> Result<Vec<TrackedFile>> {
        let base_dir = &self.backup.base_dir;

        self.backup
            .files
            .iter()
            .map(|file| {
                let local_path = if file.is_absolute() {
                    file.clone()
                } else {
                    base_dir.join(file)
                };
                TrackedFile::new(local_path, base_dir)
                    .map_err(|e| BackupError::Config(format!("backup.files: {}", e)))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.github.owner.trim().is_empty() {
            return Err(BackupError::Config(
                "github.owner is required".to_string(),
            ));
        }

        if self.github.token.trim().is_empty() {
            return Err(BackupError::Config(
                "github.token is required".to_string(),
            ));
        }

        Validator::validate_url(&self.github.api_url)
            .map_err(|e| BackupError::Config(e.to_string()))?;

        Validator::validate_repository_name(&self.backup.repository)
            .map_err(|e| BackupError::Config(e.to_string()))?;

        if self.schedule.interval_secs == 0 {
            return Err(BackupError::Config(
                "schedule.interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
