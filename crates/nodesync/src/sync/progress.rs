//! Clone progress events and git progress parsing.
//!
//! A [`RepositorySource`](super::RepositorySource) reports progress by sending
//! [`CloneProgress`] events over an unbounded channel. The sync task drains
//! the receiving end in emission order.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

static RE_PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("valid percentage regex"));
static RE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)/(\d+)\)").expect("valid count regex"));

/// One progress notification from a running clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CloneProgress {
    Started,
    TaskStarted { name: String },
    Progress { task: String, total: u64, current: u64 },
    TaskFinished { name: String },
    Finished,
}

pub type ProgressReceiver = mpsc::UnboundedReceiver<CloneProgress>;

/// Sending half handed to a repository source.
///
/// Sends never block. Events sent after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<CloneProgress>,
}

/// Creates a connected sender/receiver pair.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, rx)
}

impl ProgressSender {
    /// Returns false when nobody is listening anymore.
    pub fn send(&self, event: CloneProgress) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn started(&self) {
        self.send(CloneProgress::Started);
    }

    pub fn task_started(&self, name: impl Into<String>) {
        self.send(CloneProgress::TaskStarted { name: name.into() });
    }

    pub fn progress(&self, task: impl Into<String>, total: u64, current: u64) {
        self.send(CloneProgress::Progress {
            task: task.into(),
            total,
            current,
        });
    }

    pub fn task_finished(&self, name: impl Into<String>) {
        self.send(CloneProgress::TaskFinished { name: name.into() });
    }

    pub fn finished(&self) {
        self.send(CloneProgress::Finished);
    }
}

/// Phase of a clone as reported on git's stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GitPhase {
    Counting,
    Compressing,
    Receiving,
    Resolving,
    Unpacking,
    CheckingOut,
}

impl fmt::Display for GitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitPhase::Counting => write!(f, "Counting objects"),
            GitPhase::Compressing => write!(f, "Compressing objects"),
            GitPhase::Receiving => write!(f, "Receiving objects"),
            GitPhase::Resolving => write!(f, "Resolving deltas"),
            GitPhase::Unpacking => write!(f, "Unpacking objects"),
            GitPhase::CheckingOut => write!(f, "Updating files"),
        }
    }
}

/// Progress information parsed from one stderr line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedProgress {
    pub phase: Option<GitPhase>,
    pub current: Option<u64>,
    pub total: Option<u64>,
    pub percentage: Option<u8>,
}

/// Parses one line of `git clone --progress` stderr.
///
/// Recognized shapes:
/// - `remote: Enumerating objects: 12, done.`
/// - `remote: Counting objects: 100% (12/12), done.`
/// - `Receiving objects:  75% (9/12), 1.00 MiB | 512.00 KiB/s`
/// - `Resolving deltas: 100% (2/2), done.`
/// - `Updating files: 100% (3/3), done.`
pub fn parse_git_progress(line: &str) -> ParsedProgress {
    let mut result = ParsedProgress::default();

    let lower = line.to_lowercase();
    result.phase = if lower.contains("counting") || lower.contains("enumerating") {
        Some(GitPhase::Counting)
    } else if lower.contains("compressing") {
        Some(GitPhase::Compressing)
    } else if lower.contains("receiving") {
        Some(GitPhase::Receiving)
    } else if lower.contains("resolving") {
        Some(GitPhase::Resolving)
    } else if lower.contains("unpacking") {
        Some(GitPhase::Unpacking)
    } else if lower.contains("updating files") || lower.contains("checking out") {
        Some(GitPhase::CheckingOut)
    } else {
        None
    };

    if let Some(caps) = RE_PERCENTAGE.captures(line) {
        result.percentage = caps.get(1).and_then(|m| m.as_str().parse().ok());
    }

    if let Some(caps) = RE_COUNT.captures(line) {
        if let (Some(current), Some(total)) = (caps.get(1), caps.get(2)) {
            result.current = current.as_str().parse().ok();
            result.total = total.as_str().parse().ok();
        }
    }

    result
}

/// Turns a stream of stderr lines into [`CloneProgress`] events.
///
/// A phase change finishes the previous task and starts the next one; every
/// line with an `(n/m)` counter becomes a `Progress` event for the current
/// task.
pub struct GitProgressTracker {
    sender: ProgressSender,
    current: Option<GitPhase>,
}

impl GitProgressTracker {
    pub fn new(sender: ProgressSender) -> Self {
        Self {
            sender,
            current: None,
        }
    }

    /// Feeds one line. Returns false when the line carried no progress.
    pub fn line(&mut self, line: &str) -> bool {
        let parsed = parse_git_progress(line);
        let Some(phase) = parsed.phase else {
            return false;
        };

        if self.current != Some(phase) {
            if let Some(previous) = self.current.take() {
                self.sender.task_finished(previous.to_string());
            }
            self.sender.task_started(phase.to_string());
            self.current = Some(phase);
        }

        if let (Some(current), Some(total)) = (parsed.current, parsed.total) {
            self.sender.progress(phase.to_string(), total, current);
        }
        true
    }

    /// Closes the task still open, if any.
    pub fn finish(&mut self) {
        if let Some(previous) = self.current.take() {
            self.sender.task_finished(previous.to_string());
        }
    }
}
