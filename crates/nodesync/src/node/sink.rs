//! Narrow write interfaces the sync task uses to touch a node.
//!
//! The task never rewrites a whole node. Each status transition is a single
//! call that sets (or clears) two attributes; implementations own the
//! atomicity of that write.

use super::{NodePath, YmlStatus};
use crate::db::StoreError;
use crate::error::MergeError;

/// Reads and writes the `YML_STATUS` / `YML_ERROR_MSG` pair of a node.
pub trait NodeStatusSink: Send + Sync {
    /// Current status as persisted.
    fn yml_status(&self, path: &NodePath) -> Result<YmlStatus, StoreError>;

    /// Sets the status. `Some(message)` records the error message, `None`
    /// clears it.
    fn update_yml_status(
        &self,
        path: &NodePath,
        status: YmlStatus,
        message: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Applies cloned YAML content to a node's persisted definition.
pub trait NodeContentSink: Send + Sync {
    fn create_or_update(&self, path: &NodePath, content: &str) -> Result<(), MergeError>;
}
