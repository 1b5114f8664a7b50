use std::path::PathBuf;
use thiserror::Error;

use crate::db::StoreError;
use crate::node::NodePath;
use crate::sync::CloneError;

#[derive(Error, Debug)]
pub enum NodeSyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Clone error: {0}")]
    Clone(#[from] CloneError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Invalid node YAML: {source}")]
    InvalidYml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Node YAML must be a mapping at the root")]
    NotAMapping,

    #[error("Node not found: {0}")]
    NodeNotFound(NodePath),

    #[error("Failed to store node YAML: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Invalid workspace name '{0}'")]
    InvalidName(String),

    #[error("Workspace path exists but is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install log bridge: {0}")]
    LogBridge(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

pub type Result<T> = std::result::Result<T, NodeSyncError>;
