pub mod workspace;

pub use workspace::{ensure_workspace, WorkspaceResolver};
