//! Background synchronization of node YAML from git repositories.

pub mod error;
pub mod git;
pub mod progress;
pub mod scheduler;
pub mod source;
pub mod task;

pub use error::{classify_git_error, root_cause, CloneError};
pub use git::{GitCliSettings, GitCliSource};
pub use progress::{channel, CloneProgress, GitPhase, ProgressReceiver, ProgressSender};
pub use scheduler::SyncScheduler;
pub use source::RepositorySource;
pub use task::{SyncCallback, SyncTask};
