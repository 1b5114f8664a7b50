use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::CloneError;
use super::progress::ProgressSender;
use crate::node::Node;

/// Fetches one file of a node's remote repository.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Clones `file_name` for `node` and returns its content.
    ///
    /// Progress is reported through `progress`. Once `stop` is cancelled the
    /// call must return [`CloneError::Cancelled`] promptly.
    async fn clone_file(
        &self,
        node: &Node,
        file_name: &str,
        progress: ProgressSender,
        stop: CancellationToken,
    ) -> Result<String, CloneError>;
}
