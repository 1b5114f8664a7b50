use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration of the sync subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Base directory under which per-node workspaces are created.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// File cloned from each node's repository.
    #[serde(default = "default_yml_file_name")]
    pub yml_file_name: String,
    /// Branch used when a node has no `GIT_BRANCH`.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            database_path: default_database_path(),
            yml_file_name: default_yml_file_name(),
            default_branch: default_branch(),
            git: GitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn nodesync_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".nodesync")
}

fn default_workspace_dir() -> PathBuf {
    nodesync_home().join("workspace")
}

fn default_database_path() -> PathBuf {
    crate::db::default_database_path()
        .unwrap_or_else(|| nodesync_home().join("data").join("nodesync.db"))
}

fn default_yml_file_name() -> String {
    ".flow.yml".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    /// `--depth` passed to `git clone`.
    #[serde(default = "default_clone_depth")]
    pub clone_depth: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            clone_depth: default_clone_depth(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_clone_depth() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
