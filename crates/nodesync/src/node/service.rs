//! SQLite-backed node service.

use super::sink::{NodeContentSink, NodeStatusSink};
use super::{Node, NodePath, YmlStatus};
use crate::db::{Database, NodeRecord, NodeRepo, StoreError};
use crate::error::MergeError;

/// Persists nodes and implements both sync sinks on top of [`NodeRepo`].
#[derive(Clone)]
pub struct NodeService {
    repo: NodeRepo,
}

impl NodeService {
    pub fn new(db: Database) -> Self {
        Self {
            repo: NodeRepo::new(db),
        }
    }

    /// Inserts or replaces a node's name and attributes.
    pub fn create(&self, node: &Node) -> Result<(), StoreError> {
        self.repo.upsert(node)?;
        log::debug!("Saved node {}", node.path);
        Ok(())
    }

    pub fn find(&self, path: &NodePath) -> Result<Option<NodeRecord>, StoreError> {
        self.repo.find(path)
    }

    /// Last merged YAML, if any.
    pub fn yml(&self, path: &NodePath) -> Result<Option<String>, StoreError> {
        Ok(self.find(path)?.and_then(|record| record.yml))
    }

    fn not_found(path: &NodePath) -> StoreError {
        StoreError::NotFound {
            entity: "node",
            key: path.to_string(),
        }
    }
}

impl NodeStatusSink for NodeService {
    fn yml_status(&self, path: &NodePath) -> Result<YmlStatus, StoreError> {
        self.find(path)?
            .ok_or_else(|| Self::not_found(path))?
            .yml_status()
    }

    fn update_yml_status(
        &self,
        path: &NodePath,
        status: YmlStatus,
        message: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.repo.set_yml_status(path, status, message)? == 0 {
            return Err(Self::not_found(path));
        }
        log::debug!("Node {} status -> {}", path, status);
        Ok(())
    }
}

impl NodeContentSink for NodeService {
    fn create_or_update(&self, path: &NodePath, content: &str) -> Result<(), MergeError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|source| MergeError::InvalidYml { source })?;
        if !value.is_mapping() {
            return Err(MergeError::NotAMapping);
        }

        if self.repo.set_yml(path, content)? == 0 {
            return Err(MergeError::NodeNotFound(path.clone()));
        }

        log::info!("Merged YAML into node {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::envs;

    fn service_with_node(path: &str) -> (NodeService, NodePath) {
        let service = NodeService::new(Database::open_in_memory().unwrap());
        let node = Node::from_path(path);
        service.create(&node).unwrap();
        (service, node.path)
    }

    #[test]
    fn test_status_defaults_to_not_loaded() {
        let (service, path) = service_with_node("team/flow");
        assert_eq!(service.yml_status(&path).unwrap(), YmlStatus::NotLoaded);
    }

    #[test]
    fn test_status_of_missing_node() {
        let service = NodeService::new(Database::open_in_memory().unwrap());
        let path = NodePath::from("ghost");

        assert!(matches!(
            service.yml_status(&path),
            Err(StoreError::NotFound { entity: "node", .. })
        ));
        assert!(matches!(
            service.update_yml_status(&path, YmlStatus::GitLoading, None),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_status_round_trip() {
        let (service, path) = service_with_node("flow");

        service
            .update_yml_status(&path, YmlStatus::Error, Some("boom"))
            .unwrap();
        let record = service.find(&path).unwrap().unwrap();
        assert_eq!(record.yml_status().unwrap(), YmlStatus::Error);
        assert_eq!(record.node.env(envs::YML_ERROR_MSG), Some("boom"));
    }

    #[test]
    fn test_create_or_update_stores_mapping() {
        let (service, path) = service_with_node("flow");
        service
            .update_yml_status(&path, YmlStatus::GitLoaded, None)
            .unwrap();

        service
            .create_or_update(&path, "name: flow\nsteps:\n  - build\n")
            .unwrap();

        assert_eq!(
            service.yml(&path).unwrap().as_deref(),
            Some("name: flow\nsteps:\n  - build\n")
        );
        assert_eq!(service.yml_status(&path).unwrap(), YmlStatus::Found);
    }

    #[test]
    fn test_create_or_update_rejects_bad_content() {
        let (service, path) = service_with_node("flow");

        assert!(matches!(
            service.create_or_update(&path, "key: [unclosed"),
            Err(MergeError::InvalidYml { .. })
        ));
        assert!(matches!(
            service.create_or_update(&path, "- just\n- a list\n"),
            Err(MergeError::NotAMapping)
        ));
        assert!(service.yml(&path).unwrap().is_none());
    }

    #[test]
    fn test_create_or_update_missing_node() {
        let service = NodeService::new(Database::open_in_memory().unwrap());
        let err = service
            .create_or_update(&NodePath::from("ghost"), "a: 1")
            .unwrap_err();
        assert!(matches!(err, MergeError::NodeNotFound(_)));
    }
}
