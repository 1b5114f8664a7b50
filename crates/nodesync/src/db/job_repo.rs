//! Job repository: append-only run history per node path.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::query::{Direction, QuerySpec};
use super::repository::{Entity, Repository};
use super::{format_timestamp, parse_timestamp, Database, StoreError};
use crate::node::NodePath;

const COL_ID: &str = "id";
const COL_NODE_PATH: &str = "node_path";
const COL_STATUS: &str = "status";
const COL_SESSION_ID: &str = "session_id";
const COL_CREATED_AT: &str = "created_at";

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failure,
    Stopped,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failure => "failure",
            JobStatus::Stopped => "stopped",
        }
    }

    /// Terminal jobs are never rewritten.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failure | JobStatus::Stopped
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failure" => Ok(JobStatus::Failure),
            "stopped" => Ok(JobStatus::Stopped),
            other => Err(StoreError::Corrupt {
                column: COL_STATUS,
                value: other.to_string(),
            }),
        }
    }
}

/// One historical run for a node path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub node_path: NodePath,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Job {
    const TABLE: &'static str = "jobs";
    const KEY: &'static str = COL_ID;
    const NAME: &'static str = "job";

    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        let status: String = row.get(COL_STATUS)?;
        let created_at: String = row.get(COL_CREATED_AT)?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Self {
            id: row.get(COL_ID)?,
            node_path: NodePath::new(row.get::<_, String>(COL_NODE_PATH)?),
            status: status.parse()?,
            session_id: row.get(COL_SESSION_ID)?,
            created_at: parse_timestamp(COL_CREATED_AT, &created_at)?,
            updated_at: parse_timestamp("updated_at", &updated_at)?,
        })
    }
}

/// A job about to be appended.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub node_path: NodePath,
    pub status: JobStatus,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewJob {
    /// A pending job created now.
    pub fn new(node_path: impl Into<NodePath>) -> Self {
        Self {
            node_path: node_path.into(),
            status: JobStatus::Pending,
            session_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Append/read store over jobs.
#[derive(Clone)]
pub struct JobStore {
    repo: Repository<Job>,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self {
            repo: Repository::new(db),
        }
    }

    /// Generates a fresh session identifier for a batch of jobs.
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Appends a job and returns it with its generated id.
    pub fn append(&self, job: NewJob) -> Result<Job, StoreError> {
        // Stored precision is microseconds.
        let created_at = job.created_at.trunc_subsecs(6);
        let stamp = format_timestamp(created_at);

        let id = self.repo.database().with_conn(|conn| {
            conn.execute(
                "INSERT INTO jobs (node_path, status, session_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![
                    job.node_path.as_str(),
                    job.status.as_str(),
                    job.session_id,
                    stamp
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        log::debug!("Appended job {} for node {}", id, job.node_path);

        Ok(Job {
            id,
            node_path: job.node_path,
            status: job.status,
            session_id: job.session_id,
            created_at,
            updated_at: created_at,
        })
    }

    /// Appends a pending job created now.
    pub fn create(
        &self,
        node_path: &NodePath,
        session_id: Option<&str>,
    ) -> Result<Job, StoreError> {
        let mut job = NewJob::new(node_path.clone());
        job.session_id = session_id.map(str::to_string);
        self.append(job)
    }

    pub fn find(&self, id: i64) -> Result<Option<Job>, StoreError> {
        self.repo.get(id)
    }

    /// Moves a non-terminal job to `status`.
    pub fn update_status(&self, id: i64, status: JobStatus) -> Result<Job, StoreError> {
        let now = format_timestamp(Utc::now());

        let changed = self.repo.database().with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE jobs SET status = ?2, updated_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'running')",
                params![id, status.as_str(), now],
            )?;
            Ok(changed)
        })?;

        let job = self.find(id)?.ok_or_else(|| StoreError::NotFound {
            entity: Job::NAME,
            key: id.to_string(),
        })?;

        if changed == 0 {
            return Err(StoreError::TerminalJob {
                id,
                status: job.status.to_string(),
            });
        }

        Ok(job)
    }

    /// Every job with an identifier. No ordering guarantee.
    pub fn list_all(&self) -> Result<Vec<Job>, StoreError> {
        self.repo.find(&QuerySpec::new().not_null(COL_ID))
    }

    /// Jobs whose status is one of `statuses`.
    pub fn list_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<Job>, StoreError> {
        self.repo
            .find(&QuerySpec::new().any_of(COL_STATUS, status_values(statuses)))
    }

    /// Jobs with the given status that belong to one of `session_ids`.
    pub fn list_by_status_and_sessions<S: AsRef<str>>(
        &self,
        status: JobStatus,
        session_ids: &[S],
    ) -> Result<Vec<Job>, StoreError> {
        let spec = QuerySpec::new()
            .any_of(COL_STATUS, status_values(&[status]))
            .any_of(
                COL_SESSION_ID,
                session_ids.iter().map(|s| s.as_ref().to_string()),
            );
        self.repo.find(&spec)
    }

    /// All jobs recorded for one node path.
    pub fn list_by_node_path(&self, path: &NodePath) -> Result<Vec<Job>, StoreError> {
        self.repo
            .find(&QuerySpec::new().eq(COL_NODE_PATH, path.as_str().to_string()))
    }

    /// At most one job per requested path, in input order.
    ///
    /// Candidates are sorted by creation time ascending and the first match
    /// for each path is taken, so the job returned is the *earliest* one for
    /// that path. Paths without jobs are skipped.
    pub fn list_latest_by_node_paths(&self, paths: &[NodePath]) -> Result<Vec<Job>, StoreError> {
        let spec = QuerySpec::new()
            .any_of(
                COL_NODE_PATH,
                paths.iter().map(|p| p.as_str().to_string()),
            )
            .order_by(COL_CREATED_AT, Direction::Asc)
            .order_by(COL_ID, Direction::Asc);
        let candidates = self.repo.find(&spec)?;

        Ok(paths
            .iter()
            .filter_map(|path| candidates.iter().find(|job| &job.node_path == path))
            .cloned()
            .collect())
    }
}

fn status_values(statuses: &[JobStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}
