//! Node repository over the `nodes` table.
//!
//! Attributes are stored as a JSON object in `envs`. Status transitions
//! touch that document with `json_set`/`json_remove` inside a single
//! `UPDATE`, so a transition never races with a whole-row rewrite.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::repository::{Entity, Repository};
use super::{format_timestamp, parse_timestamp, Database, StoreError};
use crate::node::{envs, Node, NodePath, YmlStatus};

/// A persisted node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub node: Node,
    /// Last merged YAML definition.
    pub yml: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Strictly decoded status; an unknown stored value is corruption.
    pub fn yml_status(&self) -> Result<YmlStatus, StoreError> {
        self.node.yml_status().map_err(|e| StoreError::Corrupt {
            column: "envs",
            value: e.0,
        })
    }
}

impl Entity for NodeRecord {
    const TABLE: &'static str = "nodes";
    const KEY: &'static str = "path";
    const NAME: &'static str = "node";

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        let envs_json: String = row.get("envs")?;
        let envs: BTreeMap<String, String> =
            serde_json::from_str(&envs_json).map_err(|_| StoreError::Corrupt {
                column: "envs",
                value: envs_json.clone(),
            })?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Self {
            node: Node {
                path: NodePath::new(row.get::<_, String>("path")?),
                name: row.get("name")?,
                envs,
            },
            yml: row.get("yml")?,
            created_at: parse_timestamp("created_at", &created_at)?,
            updated_at: parse_timestamp("updated_at", &updated_at)?,
        })
    }
}

/// Reads and narrow writes for nodes.
#[derive(Clone)]
pub struct NodeRepo {
    repo: Repository<NodeRecord>,
}

impl NodeRepo {
    pub fn new(db: Database) -> Self {
        Self {
            repo: Repository::new(db),
        }
    }

    /// Inserts the node, or replaces name and attributes of an existing one.
    /// The stored YAML is left untouched.
    pub fn upsert(&self, node: &Node) -> Result<(), StoreError> {
        let envs = serde_json::to_string(&node.envs).map_err(|_| StoreError::Corrupt {
            column: "envs",
            value: format!("{:?}", node.envs),
        })?;
        let now = format_timestamp(Utc::now());

        self.repo.database().with_conn(|conn| {
            conn.execute(
                "INSERT INTO nodes (path, name, envs, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(path) DO UPDATE SET
                    name = excluded.name,
                    envs = excluded.envs,
                    updated_at = excluded.updated_at",
                params![node.path.as_str(), node.name, envs, now],
            )?;
            Ok(())
        })
    }

    pub fn find(&self, path: &NodePath) -> Result<Option<NodeRecord>, StoreError> {
        self.repo.get(path.as_str())
    }

    /// Sets `YML_STATUS`, and sets or clears `YML_ERROR_MSG`.
    ///
    /// Returns the number of rows touched (0 when the node does not exist).
    pub fn set_yml_status(
        &self,
        path: &NodePath,
        status: YmlStatus,
        message: Option<&str>,
    ) -> Result<usize, StoreError> {
        let now = format_timestamp(Utc::now());
        let status_path = json_key(envs::YML_STATUS);
        let message_path = json_key(envs::YML_ERROR_MSG);

        self.repo.database().with_conn(|conn| {
            let changed = match message {
                Some(message) => conn.execute(
                    "UPDATE nodes SET envs = json_set(envs, ?2, ?3, ?4, ?5), updated_at = ?6
                     WHERE path = ?1",
                    params![
                        path.as_str(),
                        status_path,
                        status.as_str(),
                        message_path,
                        message,
                        now
                    ],
                )?,
                None => conn.execute(
                    "UPDATE nodes SET envs = json_remove(json_set(envs, ?2, ?3), ?4), updated_at = ?5
                     WHERE path = ?1",
                    params![path.as_str(), status_path, status.as_str(), message_path, now],
                )?,
            };
            Ok(changed)
        })
    }

    /// Stores merged YAML, marks the node `FOUND` and clears the error message.
    pub fn set_yml(&self, path: &NodePath, yml: &str) -> Result<usize, StoreError> {
        let now = format_timestamp(Utc::now());

        self.repo.database().with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE nodes SET yml = ?2,
                    envs = json_remove(json_set(envs, ?3, ?4), ?5),
                    updated_at = ?6
                 WHERE path = ?1",
                params![
                    path.as_str(),
                    yml,
                    json_key(envs::YML_STATUS),
                    YmlStatus::Found.as_str(),
                    json_key(envs::YML_ERROR_MSG),
                    now
                ],
            )?;
            Ok(changed)
        })
    }
}

/// JSON path selecting a top-level attribute.
fn json_key(key: &str) -> String {
    format!("$.\"{}\"", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> NodeRepo {
        NodeRepo::new(Database::open_in_memory().expect("Failed to create test database"))
    }

    fn sample_node() -> Node {
        Node::from_path("team/flow-a").with_env(envs::GIT_URL, "https://example.com/a.git")
    }

    #[test]
    fn test_upsert_and_find() {
        let repo = test_repo();
        repo.upsert(&sample_node()).unwrap();

        let found = repo.find(&NodePath::from("team/flow-a")).unwrap().unwrap();
        assert_eq!(found.node.name, "flow-a");
        assert_eq!(
            found.node.git_url(),
            Some("https://example.com/a.git")
        );
        assert!(found.yml.is_none());
        assert_eq!(found.yml_status().unwrap(), YmlStatus::NotLoaded);
    }

    #[test]
    fn test_upsert_replaces_attributes() {
        let repo = test_repo();
        repo.upsert(&sample_node()).unwrap();

        let updated = sample_node().with_env(envs::GIT_BRANCH, "develop");
        repo.upsert(&updated).unwrap();

        let found = repo.find(&updated.path).unwrap().unwrap();
        assert_eq!(found.node.git_branch(), Some("develop"));
    }

    #[test]
    fn test_set_status_with_and_without_message() {
        let repo = test_repo();
        let node = sample_node();
        repo.upsert(&node).unwrap();

        let changed = repo
            .set_yml_status(&node.path, YmlStatus::Error, Some("connection refused"))
            .unwrap();
        assert_eq!(changed, 1);
        let found = repo.find(&node.path).unwrap().unwrap();
        assert_eq!(found.yml_status().unwrap(), YmlStatus::Error);
        assert_eq!(found.node.yml_error_message(), Some("connection refused"));
        // Unrelated attributes survive the narrow update.
        assert!(found.node.git_url().is_some());

        repo.set_yml_status(&node.path, YmlStatus::GitLoading, None)
            .unwrap();
        let found = repo.find(&node.path).unwrap().unwrap();
        assert_eq!(found.yml_status().unwrap(), YmlStatus::GitLoading);
        assert_eq!(found.node.yml_error_message(), None);
    }

    #[test]
    fn test_set_status_on_missing_node_touches_nothing() {
        let repo = test_repo();
        let changed = repo
            .set_yml_status(&NodePath::from("ghost"), YmlStatus::GitLoading, None)
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_set_yml_marks_found() {
        let repo = test_repo();
        let node = sample_node();
        repo.upsert(&node).unwrap();
        repo.set_yml_status(&node.path, YmlStatus::Error, Some("boom"))
            .unwrap();

        assert_eq!(repo.set_yml(&node.path, "flow:\n  name: a\n").unwrap(), 1);

        let found = repo.find(&node.path).unwrap().unwrap();
        assert_eq!(found.yml.as_deref(), Some("flow:\n  name: a\n"));
        assert_eq!(found.yml_status().unwrap(), YmlStatus::Found);
        assert_eq!(found.node.yml_error_message(), None);
    }
}
