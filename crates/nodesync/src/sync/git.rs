//! [`RepositorySource`] backed by the system `git` binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;

use super::error::{classify_git_error, CloneError};
use super::progress::{GitProgressTracker, ProgressSender};
use super::source::RepositorySource;
use crate::config::SyncConfig;
use crate::node::Node;
use crate::sanitize::redact_repo_url;
use crate::storage::WorkspaceResolver;

/// Directory inside a node workspace that holds the checkout.
const CHECKOUT_DIR: &str = "repo";

/// Stderr lines kept for error classification.
const MAX_STDERR_LINES: usize = 50;

#[derive(Debug, Clone)]
pub struct GitCliSettings {
    pub workspace_dir: PathBuf,
    pub default_branch: String,
    pub clone_depth: u32,
    pub timeout: Duration,
}

impl GitCliSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            workspace_dir: config.workspace_dir.clone(),
            default_branch: config.default_branch.clone(),
            clone_depth: config.git.clone_depth,
            timeout: Duration::from_secs(config.git.timeout_secs),
        }
    }
}

/// Shallow-clones a node's repository into its workspace and reads one file.
pub struct GitCliSource {
    settings: GitCliSettings,
    workspaces: WorkspaceResolver,
}

enum CloneOutcome {
    Exited(std::io::Result<std::process::ExitStatus>, String),
    Cancelled,
    TimedOut,
}

impl GitCliSource {
    pub fn new(settings: GitCliSettings) -> Self {
        let workspaces = WorkspaceResolver::new(&settings.workspace_dir);
        Self {
            settings,
            workspaces,
        }
    }

    pub fn settings(&self) -> &GitCliSettings {
        &self.settings
    }

    fn clone_args(&self, url: &str, branch: &str, target: &Path) -> Vec<String> {
        vec![
            "clone".to_string(),
            "--progress".to_string(),
            "--depth".to_string(),
            self.settings.clone_depth.to_string(),
            "--branch".to_string(),
            branch.to_string(),
            "--".to_string(),
            url.to_string(),
            target.to_string_lossy().into_owned(),
        ]
    }

    async fn remove_previous_checkout(checkout: &Path) -> Result<(), CloneError> {
        match tokio::fs::remove_dir_all(checkout).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CloneError::RemoveCheckout {
                path: checkout.to_path_buf(),
                source: e,
            }),
        }
    }
}

#[async_trait]
impl RepositorySource for GitCliSource {
    async fn clone_file(
        &self,
        node: &Node,
        file_name: &str,
        progress: ProgressSender,
        stop: CancellationToken,
    ) -> Result<String, CloneError> {
        let url = node.git_url().ok_or_else(|| CloneError::MissingRemote {
            path: node.path.clone(),
        })?;
        let branch = node
            .git_branch()
            .unwrap_or(self.settings.default_branch.as_str());

        let workspace = self.workspaces.ensure_async(&node.name).await?;
        let checkout = workspace.join(CHECKOUT_DIR);
        Self::remove_previous_checkout(&checkout).await?;

        tracing::info!(
            url = %redact_repo_url(url),
            branch,
            workspace = %workspace.display(),
            "Cloning node repository"
        );

        progress.started();

        let mut cmd = TokioCommand::new("git");
        cmd.args(self.clone_args(url, branch, &checkout))
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| CloneError::Spawn { source: e })?;
        let stderr_pipe = child.stderr.take();
        let mut tracker = GitProgressTracker::new(progress.clone());

        let outcome = {
            let run = async {
                let stderr_text = match stderr_pipe {
                    Some(stderr) => pump_stderr(stderr, &mut tracker).await,
                    None => String::new(),
                };
                let status = child.wait().await;
                CloneOutcome::Exited(status, stderr_text)
            };

            tokio::select! {
                biased;
                _ = stop.cancelled() => CloneOutcome::Cancelled,
                _ = tokio::time::sleep(self.settings.timeout) => CloneOutcome::TimedOut,
                outcome = run => outcome,
            }
        };

        match outcome {
            CloneOutcome::Cancelled => {
                let _ = child.kill().await;
                tracing::info!("Clone cancelled");
                Err(CloneError::Cancelled)
            }
            CloneOutcome::TimedOut => {
                let _ = child.kill().await;
                Err(CloneError::Timeout(self.settings.timeout.as_secs()))
            }
            CloneOutcome::Exited(Err(e), _) => Err(CloneError::Git(e.to_string())),
            CloneOutcome::Exited(Ok(status), stderr_text) => {
                tracker.finish();

                if !status.success() {
                    if stderr_text.trim().is_empty() {
                        return Err(CloneError::Git(format!(
                            "git clone exited with code {}",
                            status.code().unwrap_or(-1)
                        )));
                    }
                    return Err(classify_git_error(&stderr_text));
                }

                progress.finished();
                read_cloned_file(&checkout, file_name).await
            }
        }
    }
}

/// Streams git's stderr through the tracker. Git separates progress updates
/// with `\r`, so both `\r` and `\n` end a line. Returns the non-progress lines.
async fn pump_stderr<R>(stderr: R, tracker: &mut GitProgressTracker) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();
    let mut kept: Vec<String> = Vec::new();

    let mut flush = |pending: &mut Vec<u8>, kept: &mut Vec<String>| {
        if pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(pending).trim().to_string();
        pending.clear();
        if line.is_empty() || tracker.line(&line) {
            return;
        }
        tracing::debug!(line = %line, "git");
        if kept.len() == MAX_STDERR_LINES {
            kept.remove(0);
        }
        kept.push(line);
    };

    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                for &byte in &buf[..n] {
                    if byte == b'\r' || byte == b'\n' {
                        flush(&mut pending, &mut kept);
                    } else {
                        pending.push(byte);
                    }
                }
            }
        }
    }
    flush(&mut pending, &mut kept);

    kept.join("\n")
}

async fn read_cloned_file(checkout: &Path, file_name: &str) -> Result<String, CloneError> {
    let path = checkout.join(file_name);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CloneError::FileNotFound {
            file: file_name.to_string(),
        }),
        Err(e) => Err(CloneError::ReadFile { path, source: e }),
    }
}
