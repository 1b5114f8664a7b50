//! Nodes: units of pipeline configuration addressed by path.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod service;
pub mod sink;
pub mod status;

pub use service::NodeService;
pub use sink::{NodeContentSink, NodeStatusSink};
pub use status::{ParseYmlStatusError, YmlStatus};

/// Attribute keys understood by the sync subsystem.
pub mod envs {
    /// Serialized [`YmlStatus`](super::YmlStatus).
    pub const YML_STATUS: &str = "YML_STATUS";
    /// Root-cause message of the last failed clone.
    pub const YML_ERROR_MSG: &str = "YML_ERROR_MSG";
    /// Remote repository URL.
    pub const GIT_URL: &str = "GIT_URL";
    /// Branch to clone; falls back to the configured default.
    pub const GIT_BRANCH: &str = "GIT_BRANCH";
}

/// Unique path of a node, e.g. `team/flow-a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `/`-separated segment.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NodePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A node snapshot: path, display name and environment-like attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub path: NodePath,
    pub name: String,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
}

impl Node {
    pub fn new(path: impl Into<NodePath>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            envs: BTreeMap::new(),
        }
    }

    /// Creates a node whose name is the last segment of its path.
    pub fn from_path(path: impl Into<NodePath>) -> Self {
        let path = path.into();
        let name = path.last_segment().to_string();
        Self::new(path, name)
    }

    /// Builder-style attribute setter.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put_env(key, value);
        self
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.envs.get(key).map(String::as_str)
    }

    pub fn put_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.envs.insert(key.into(), value.into());
    }

    pub fn remove_env(&mut self, key: &str) -> Option<String> {
        self.envs.remove(key)
    }

    /// Status recorded in this snapshot. An absent attribute is `NOT_LOADED`.
    pub fn yml_status(&self) -> Result<YmlStatus, ParseYmlStatusError> {
        match self.env(envs::YML_STATUS) {
            Some(value) => value.parse(),
            None => Ok(YmlStatus::NotLoaded),
        }
    }

    pub fn yml_error_message(&self) -> Option<&str> {
        self.env(envs::YML_ERROR_MSG)
    }

    pub fn git_url(&self) -> Option<&str> {
        self.env(envs::GIT_URL).filter(|url| !url.trim().is_empty())
    }

    pub fn git_branch(&self) -> Option<&str> {
        self.env(envs::GIT_BRANCH).filter(|b| !b.trim().is_empty())
    }
}

/// Cloned YAML content of one node, handed to completion callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Yml {
    pub path: NodePath,
    pub content: String,
}

impl Yml {
    pub fn new(path: NodePath, content: impl Into<String>) -> Self {
        Self {
            path,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_uses_last_segment() {
        let node = Node::from_path("team/project/flow-a");
        assert_eq!(node.name, "flow-a");
        assert_eq!(node.path.as_str(), "team/project/flow-a");

        let root = Node::from_path("flow-b");
        assert_eq!(root.name, "flow-b");
    }

    #[test]
    fn test_missing_status_is_not_loaded() {
        let node = Node::from_path("flow");
        assert_eq!(node.yml_status().unwrap(), YmlStatus::NotLoaded);
    }

    #[test]
    fn test_status_from_env() {
        let node = Node::from_path("flow").with_env(envs::YML_STATUS, "GIT_LOADING");
        assert_eq!(node.yml_status().unwrap(), YmlStatus::GitLoading);

        let broken = Node::from_path("flow").with_env(envs::YML_STATUS, "bogus");
        assert!(broken.yml_status().is_err());
    }

    #[test]
    fn test_blank_git_settings_are_absent() {
        let node = Node::from_path("flow")
            .with_env(envs::GIT_URL, "  ")
            .with_env(envs::GIT_BRANCH, "develop");
        assert_eq!(node.git_url(), None);
        assert_eq!(node.git_branch(), Some("develop"));
    }

    #[test]
    fn test_node_serialization() {
        let node = Node::from_path("a/b").with_env(envs::GIT_URL, "https://example.com/r.git");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["path"], "a/b");
        assert_eq!(json["envs"]["GIT_URL"], "https://example.com/r.git");
    }
}
