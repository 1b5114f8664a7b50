//! Dispatches sync tasks onto the Tokio runtime, one per node path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::source::RepositorySource;
use super::task::{SyncCallback, SyncTask};
use crate::db::StoreError;
use crate::node::{Node, NodeContentSink, NodePath, NodeStatusSink, YmlStatus};

struct RunningTask {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl RunningTask {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Starts and stops [`SyncTask`]s.
///
/// At most one task runs per node path. Different paths run in parallel.
pub struct SyncScheduler {
    source: Arc<dyn RepositorySource>,
    status_sink: Arc<dyn NodeStatusSink>,
    content_sink: Arc<dyn NodeContentSink>,
    file_name: String,
    runtime: Handle,
    running: Mutex<HashMap<NodePath, RunningTask>>,
}

impl SyncScheduler {
    /// Creates a scheduler bound to the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(
        source: Arc<dyn RepositorySource>,
        status_sink: Arc<dyn NodeStatusSink>,
        content_sink: Arc<dyn NodeContentSink>,
        file_name: impl Into<String>,
    ) -> Self {
        Self::with_runtime(
            source,
            status_sink,
            content_sink,
            file_name,
            Handle::current(),
        )
    }

    pub fn with_runtime(
        source: Arc<dyn RepositorySource>,
        status_sink: Arc<dyn NodeStatusSink>,
        content_sink: Arc<dyn NodeContentSink>,
        file_name: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            source,
            status_sink,
            content_sink,
            file_name: file_name.into(),
            runtime,
            running: Mutex::new(HashMap::new()),
        }
    }

    fn running(&self) -> MutexGuard<'_, HashMap<NodePath, RunningTask>> {
        // The map holds no invariants a panic could break.
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Marks the node `GIT_CONNECTING` and starts a sync for it.
    ///
    /// Returns `Ok(false)` without touching the node when a task for the same
    /// path is still running.
    pub fn submit(&self, node: Node, callback: Option<SyncCallback>) -> Result<bool, StoreError> {
        let mut running = self.running();
        running.retain(|_, task| task.is_live());

        if running.contains_key(&node.path) {
            tracing::info!(path = %node.path, "YAML sync already running, not starting another");
            return Ok(false);
        }

        self.status_sink
            .update_yml_status(&node.path, YmlStatus::GitConnecting, None)?;

        let stop = CancellationToken::new();
        let path = node.path.clone();
        let mut task = SyncTask::new(
            node,
            self.file_name.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.status_sink),
            Arc::clone(&self.content_sink),
        )
        .with_stop_token(stop.clone());
        if let Some(callback) = callback {
            task = task.with_callback(callback);
        }

        let handle = self.runtime.spawn(task.run());
        running.insert(path, RunningTask { stop, handle });
        Ok(true)
    }

    /// Stops the running task for `path`.
    ///
    /// The node is set to `NOT_LOADED` before the task is cancelled, so the
    /// task sees a non-loading status and records no error. Returns
    /// `Ok(false)` when nothing was running.
    pub fn stop(&self, path: &NodePath) -> Result<bool, StoreError> {
        let running = self.running();

        let Some(task) = running.get(path).filter(|task| task.is_live()) else {
            return Ok(false);
        };

        self.status_sink
            .update_yml_status(path, YmlStatus::NotLoaded, None)?;
        task.stop.cancel();

        tracing::info!(path = %path, "YAML sync stopped");
        Ok(true)
    }

    pub fn is_running(&self, path: &NodePath) -> bool {
        self.running().get(path).is_some_and(RunningTask::is_live)
    }

    /// Waits for the task of `path` to finish.
    ///
    /// Finished tasks are forgotten on the next [`submit`](Self::submit), so
    /// this returns false both when nothing was started for `path` and when
    /// its task has already been swept.
    pub async fn join(&self, path: &NodePath) -> bool {
        let Some(task) = self.running().remove(path) else {
            return false;
        };

        if let Err(e) = task.handle.await {
            tracing::error!(path = %path, error = %e, "YAML sync task panicked");
        }
        true
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        for task in self.running().values() {
            task.stop.cancel();
        }
    }
}
