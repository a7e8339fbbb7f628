//! Project loading: reading a game directory from disk.

mod workspace_loader;

pub use workspace_loader::WorkspaceLoader;
