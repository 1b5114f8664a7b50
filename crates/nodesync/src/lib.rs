pub mod config;
pub mod db;
pub mod error;
pub mod node;
pub mod sanitize;
pub mod storage;
pub mod sync;
pub mod telemetry;

pub use config::{load_config, load_config_from_str, SyncConfig};
pub use db::{Database, Job, JobStatus, JobStore, NewJob, StoreError};
pub use error::{
    ConfigError, MergeError, NodeSyncError, Result, TelemetryError, WorkspaceError,
};
pub use node::{Node, NodePath, NodeService, Yml, YmlStatus};
pub use storage::{ensure_workspace, WorkspaceResolver};
pub use sync::{
    CloneError, CloneProgress, GitCliSettings, GitCliSource, ProgressSender, RepositorySource,
    SyncCallback, SyncScheduler, SyncTask,
};
pub use telemetry::init_logging;
