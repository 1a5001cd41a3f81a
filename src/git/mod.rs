//! Git operations behind a mockable trait.
//!
//! Index and history mutations shell out to the system `git` binary so the
//! user's config, hooks, SSH agent, and credential store all apply. Read-only
//! remote inspection uses git2.

pub mod cli;
pub mod remote;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::GitError;

pub use cli::GitCli;
pub use remote::{PushCapability, Transport, query_push_capability};

/// The version-control operations a commit run needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Fail with [`GitError::NotInstalled`] when the tool is unavailable.
    async fn ensure_installed(&self) -> Result<(), GitError>;

    /// Whether `root` is inside a working tree.
    async fn is_inside_work_tree(&self, root: &Path) -> Result<bool, GitError>;

    /// Stage every pending change in the working tree except `exclude`
    /// (paths relative to `root`).
    async fn stage_all(&self, root: &Path, exclude: &[PathBuf]) -> Result<(), GitError>;

    /// Textual diff of the staged changes.
    async fn staged_diff(&self, root: &Path) -> Result<String, GitError>;

    /// Create a commit with `message` as its full message.
    async fn commit(&self, root: &Path, message: &str) -> Result<(), GitError>;

    /// Ask whether `remote` can be pushed to without interactive auth.
    async fn push_capability(&self, root: &Path, remote: &str)
    -> Result<PushCapability, GitError>;

    /// Push the current branch to `remote`.
    async fn push(&self, root: &Path, remote: &str) -> Result<(), GitError>;
}
