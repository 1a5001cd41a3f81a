//! `git` binary invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::VersionControl;
use super::remote::{PushCapability, query_push_capability};
use crate::error::GitError;

/// [`VersionControl`] backed by the `git` executable on PATH.
#[derive(Debug, Default, Clone)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn ensure_installed(&self) -> Result<(), GitError> {
        if which::which("git").is_err() {
            return Err(GitError::NotInstalled);
        }
        run_git(None, &["--version"], "version check").await?;
        Ok(())
    }

    async fn is_inside_work_tree(&self, root: &Path) -> Result<bool, GitError> {
        match run_git(Some(root), &["rev-parse", "--is-inside-work-tree"], "rev-parse").await {
            Ok(stdout) => Ok(stdout.trim() == "true"),
            Err(GitError::CommandFailed { stderr, .. }) => {
                debug!("rev-parse failed in {}: {}", root.display(), stderr);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn stage_all(&self, root: &Path, exclude: &[PathBuf]) -> Result<(), GitError> {
        let args = add_args(exclude);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_git(Some(root), &args, "add").await?;
        Ok(())
    }

    async fn staged_diff(&self, root: &Path) -> Result<String, GitError> {
        run_git(
            Some(root),
            &["diff", "--cached", "--no-color", "--no-ext-diff"],
            "diff",
        )
        .await
    }

    async fn commit(&self, root: &Path, message: &str) -> Result<(), GitError> {
        run_git(Some(root), &["commit", "-m", message], "commit").await?;
        Ok(())
    }

    async fn push_capability(
        &self,
        root: &Path,
        remote: &str,
    ) -> Result<PushCapability, GitError> {
        let root = root.to_path_buf();
        let name = remote.to_string();
        // git2 reads config and refs synchronously
        tokio::task::spawn_blocking(move || query_push_capability(&root, &name))
            .await
            .map_err(|source| GitError::QueryAborted {
                remote: remote.to_string(),
                source,
            })?
    }

    async fn push(&self, root: &Path, remote: &str) -> Result<(), GitError> {
        run_git(Some(root), &["push", remote, "HEAD"], "push").await?;
        Ok(())
    }
}

/// Arguments for `git add` staging everything except `exclude`.
///
/// Excluded paths are matched literally, so file names with glob characters
/// never widen the exclusion.
fn add_args(exclude: &[PathBuf]) -> Vec<String> {
    let mut args = vec!["add".to_string(), "-A".to_string()];
    if !exclude.is_empty() {
        args.push("--".to_string());
        args.push(".".to_string());
        for path in exclude {
            args.push(format!(":(exclude,literal){}", path.to_string_lossy()));
        }
    }
    args
}

/// Run a git command and return its stdout, or a descriptive error.
///
/// Terminal prompts are disabled so an unattended run fails fast instead of
/// blocking on a credential prompt.
async fn run_git(cwd: Option<&Path>, args: &[&str], operation: &str) -> Result<String, GitError> {
    let mut command = Command::new("git");
    command
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!("Running git {}", args.first().copied().unwrap_or_default());

    let output = command.output().await.map_err(|source| GitError::SpawnFailed {
        operation: operation.to_string(),
        source,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stderr = if stderr.is_empty() {
            // git commit reports some failures (e.g. nothing to commit) on stdout
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        return Err(GitError::CommandFailed {
            operation: operation.to_string(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
