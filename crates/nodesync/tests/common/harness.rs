//! Isolated database + workspace environment.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use nodesync::db::{Database, JobStore};
use nodesync::node::{envs, Node, NodePath, NodeService, NodeStatusSink, YmlStatus};

pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub workspace_dir: PathBuf,
    pub db: Database,
    pub nodes: Arc<NodeService>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("nodesync.db");
        let workspace_dir = temp_dir.path().join("workspace");
        let db = Database::open(&db_path).expect("Failed to open test database");
        let nodes = Arc::new(NodeService::new(db.clone()));

        Self {
            temp_dir,
            db_path,
            workspace_dir,
            db,
            nodes,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    pub fn jobs(&self) -> JobStore {
        JobStore::new(self.db.clone())
    }

    /// Persists a node with the given status and returns it.
    pub fn node(&self, path: &str, status: YmlStatus) -> Node {
        let node = Node::from_path(path).with_env(envs::YML_STATUS, status.as_str());
        self.nodes.create(&node).expect("Failed to create node");
        node
    }

    pub fn status(&self, path: &NodePath) -> YmlStatus {
        self.nodes.yml_status(path).expect("Failed to read status")
    }

    pub fn error_message(&self, path: &NodePath) -> Option<String> {
        self.nodes
            .find(path)
            .expect("Failed to read node")
            .and_then(|record| record.node.yml_error_message().map(str::to_string))
    }
}
