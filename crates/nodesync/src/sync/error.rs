//! Clone error types.

use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

use crate::error::WorkspaceError;
use crate::node::NodePath;

/// Errors a [`RepositorySource`](super::RepositorySource) can fail with.
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Failed to spawn git: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Git network error: {0}")]
    Network(String),

    #[error("Git authentication failed: {0}")]
    AuthFailed(String),

    #[error("Git operation timed out after {0}s")]
    Timeout(u64),

    #[error("Clone cancelled")]
    Cancelled,

    #[error("Node '{path}' has no remote repository configured")]
    MissingRemote { path: NodePath },

    #[error("File '{file}' not found in repository")]
    FileNotFound { file: String },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove previous checkout '{path}': {source}")]
    RemoveCheckout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare workspace: {0}")]
    Workspace(#[source] WorkspaceError),
}

impl From<WorkspaceError> for CloneError {
    fn from(err: WorkspaceError) -> Self {
        CloneError::Workspace(err)
    }
}

/// Classifies git stderr into a more specific variant.
pub fn classify_git_error(stderr: &str) -> CloneError {
    let lower = stderr.to_lowercase();
    let message = stderr.trim().to_string();

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
        || lower.contains("failed to connect")
        || lower.contains("couldn't connect to server")
        || lower.contains("the remote end hung up unexpectedly")
    {
        return CloneError::Network(message);
    }

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("invalid credentials")
        || lower.contains("could not read username")
    {
        return CloneError::AuthFailed(message);
    }

    CloneError::Git(message)
}

/// Deepest error in the `source()` chain.
pub fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_network() {
        let err = classify_git_error(
            "fatal: unable to access 'https://example.com/r.git/': Could not resolve host: example.com\n",
        );
        assert!(matches!(err, CloneError::Network(_)));
    }

    #[test]
    fn test_classify_auth() {
        let err = classify_git_error("git@example.com: Permission denied (publickey).");
        assert!(matches!(err, CloneError::AuthFailed(_)));
    }

    #[test]
    fn test_classify_fallback_trims() {
        let err = classify_git_error("  fatal: Remote branch nope not found in upstream origin\n");
        match err {
            CloneError::Git(msg) => {
                assert_eq!(msg, "fatal: Remote branch nope not found in upstream origin")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_root_cause_walks_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let err = CloneError::Workspace(WorkspaceError::CreateDirectory {
            path: PathBuf::from("/ws/flow"),
            source: io,
        });

        assert_eq!(root_cause(&err).to_string(), "read-only fs");
    }

    #[test]
    fn test_root_cause_of_leaf_is_itself() {
        let err = CloneError::Timeout(5);
        assert_eq!(root_cause(&err).to_string(), "Git operation timed out after 5s");
    }
}
