//! One clone attempt for one node.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::error::{root_cause, CloneError};
use super::progress::{self, CloneProgress};
use super::source::RepositorySource;
use crate::node::{Node, NodeContentSink, NodePath, NodeStatusSink, Yml, YmlStatus};

/// Invoked once with the cloned content after a successful run.
pub type SyncCallback = Box<dyn FnOnce(Yml) + Send>;

/// Clones a node's YAML file, mirrors progress into the node status, merges
/// the content and notifies the caller.
///
/// A run never fails outward: clone errors end up in the node's
/// `YML_STATUS`/`YML_ERROR_MSG`, merge errors are logged. A stopped run
/// leaves the status to whoever stopped it.
pub struct SyncTask {
    node: Node,
    file_name: String,
    source: Arc<dyn RepositorySource>,
    status_sink: Arc<dyn NodeStatusSink>,
    content_sink: Arc<dyn NodeContentSink>,
    callback: Option<SyncCallback>,
    stop: CancellationToken,
}

impl SyncTask {
    pub fn new(
        node: Node,
        file_name: impl Into<String>,
        source: Arc<dyn RepositorySource>,
        status_sink: Arc<dyn NodeStatusSink>,
        content_sink: Arc<dyn NodeContentSink>,
    ) -> Self {
        Self {
            node,
            file_name: file_name.into(),
            source,
            status_sink,
            content_sink,
            callback: None,
            stop: CancellationToken::new(),
        }
    }

    pub fn with_callback(mut self, callback: SyncCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Token whose cancellation aborts the clone.
    pub fn with_stop_token(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub async fn run(self) {
        let span = tracing::info_span!("yml_sync", path = %self.node.path);
        self.execute().instrument(span).await
    }

    async fn execute(self) {
        let SyncTask {
            node,
            file_name,
            source,
            status_sink,
            content_sink,
            callback,
            stop,
        } = self;
        let path = &node.path;

        tracing::info!(file = %file_name, "Starting YAML sync");

        let (tx, mut rx) = progress::channel();

        let clone = async {
            // `tx` moves into the call; the channel closes once the source
            // drops every sender.
            source.clone_file(&node, &file_name, tx, stop.clone()).await
        };
        let events = async {
            while let Some(event) = rx.recv().await {
                // After a stop the status belongs to whoever stopped us.
                if stop.is_cancelled() {
                    tracing::trace!(?event, "Dropping progress after stop");
                    continue;
                }
                on_progress(status_sink.as_ref(), path, event);
            }
        };
        let (result, ()) = tokio::join!(clone, events);

        let content = match result {
            Ok(content) => content,
            Err(err) => {
                let cause = root_cause(&err).to_string();
                if stop.is_cancelled() || matches!(err, CloneError::Cancelled) {
                    tracing::info!(error = %cause, "YAML sync stopped");
                    return;
                }
                match status_sink.yml_status(path) {
                    Ok(status) if status.is_loading() => {
                        tracing::error!(error = %cause, "YAML sync failed");
                        if let Err(e) =
                            status_sink.update_yml_status(path, YmlStatus::Error, Some(&cause))
                        {
                            tracing::warn!(error = %e, "Failed to record sync error");
                        }
                    }
                    Ok(status) => {
                        tracing::info!(
                            status = %status,
                            error = %cause,
                            "YAML sync ended after status changed externally"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %cause,
                            status_error = %e,
                            "YAML sync failed and node status is unreadable"
                        );
                    }
                }
                return;
            }
        };

        if let Err(e) = content_sink.create_or_update(path, &content) {
            tracing::warn!(error = %e, "Failed to merge node YAML");
        }

        if let Some(callback) = callback {
            callback(Yml::new(path.clone(), content));
        }

        tracing::info!("YAML sync finished");
    }
}

fn on_progress(sink: &dyn NodeStatusSink, path: &NodePath, event: CloneProgress) {
    match event {
        CloneProgress::Started => {}
        CloneProgress::TaskStarted { name } => tracing::debug!(task = %name, "Git task started"),
        CloneProgress::TaskFinished { name } => tracing::debug!(task = %name, "Git task finished"),
        CloneProgress::Progress {
            task,
            total,
            current,
        } => {
            tracing::trace!(task = %task, current, total, "Git progress");
            match sink.yml_status(path) {
                Ok(YmlStatus::GitLoading) => {}
                Ok(_) => set_status(sink, path, YmlStatus::GitLoading),
                Err(e) => tracing::warn!(error = %e, "Failed to read node status"),
            }
        }
        CloneProgress::Finished => set_status(sink, path, YmlStatus::GitLoaded),
    }
}

fn set_status(sink: &dyn NodeStatusSink, path: &NodePath, status: YmlStatus) {
    if let Err(e) = sink.update_yml_status(path, status, None) {
        tracing::warn!(status = %status, error = %e, "Failed to update node status");
    }
}
