use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;

/// Materializes per-node working directories under a base directory.
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    base: PathBuf,
}

impl WorkspaceResolver {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns `base/<node_name>`, creating it (and any missing parents) if
    /// needed. Calling it again for the same name returns the same path.
    pub fn ensure(&self, node_name: &str) -> Result<PathBuf, WorkspaceError> {
        ensure_workspace(&self.base, node_name)
    }

    /// [`ensure`](Self::ensure) on `tokio::fs`, for callers on the runtime.
    pub async fn ensure_async(&self, node_name: &str) -> Result<PathBuf, WorkspaceError> {
        validate_name(node_name)?;
        let path = self.base.join(node_name);

        match tokio::fs::create_dir_all(&path).await {
            Ok(()) => Ok(path),
            Err(e) => {
                let is_dir = tokio::fs::metadata(&path).await.ok().map(|m| m.is_dir());
                creation_failure(path, e, is_dir)
            }
        }
    }
}

/// Free-standing form of [`WorkspaceResolver::ensure`].
pub fn ensure_workspace(base: &Path, node_name: &str) -> Result<PathBuf, WorkspaceError> {
    validate_name(node_name)?;
    let path = base.join(node_name);

    match std::fs::create_dir_all(&path) {
        Ok(()) => Ok(path),
        Err(e) => {
            let is_dir = std::fs::metadata(&path).ok().map(|m| m.is_dir());
            creation_failure(path, e, is_dir)
        }
    }
}

/// Maps a failed `create_dir_all`. `is_dir` is `None` when nothing exists at
/// `path`.
fn creation_failure(
    path: PathBuf,
    err: std::io::Error,
    is_dir: Option<bool>,
) -> Result<PathBuf, WorkspaceError> {
    match (err.kind(), is_dir) {
        // A concurrent creator may have won the race; only a real directory counts.
        (std::io::ErrorKind::AlreadyExists, Some(true)) => Ok(path),
        (std::io::ErrorKind::AlreadyExists, _) | (_, Some(false)) => {
            Err(WorkspaceError::NotADirectory(path))
        }
        _ => Err(WorkspaceError::CreateDirectory { path, source: err }),
    }
}

fn validate_name(name: &str) -> Result<(), WorkspaceError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(WorkspaceError::InvalidName(name.to_string()));
    }
    Ok(())
}
