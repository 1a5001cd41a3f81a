//! Error types for autocommit modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git executable not found. Install git and make sure it is on PATH")]
    NotInstalled,

    #[error("Failed to run git {operation}: {source}")]
    SpawnFailed {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Remote '{0}' not found: {1}")]
    RemoteNotFound(String, #[source] git2::Error),

    #[error("Remote '{0}' has no URL")]
    RemoteUrlMissing(String),

    #[error("Remote query for '{remote}' did not complete: {source}")]
    QueryAborted {
        remote: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Errors from reading or writing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings file {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Invalid TOML in {path}: {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to open settings file {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },
}

/// Conditions reported by the message generator.
///
/// None of these abort a run: the generator degrades to the fallback message
/// and hands the condition back for surfacing.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Gemini API key is missing. Set api_key in the settings file or AUTOCOMMIT_API_KEY")]
    CredentialMissing,

    #[error("Request to the generation API failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Generation API returned an error{}: {message}",
        status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Service {
        status: Option<u16>,
        message: String,
    },

    #[error("Generation API response contained no message text")]
    EmptyResponse,
}

/// Errors that end a commit run.
#[derive(Error, Debug)]
pub enum AutoCommitError {
    #[error("No workspace folder found at {0}")]
    MissingWorkspace(PathBuf),

    #[error("git is not installed or not on PATH")]
    ToolUnavailable,

    #[error("{0} is not inside a git working tree")]
    NotARepository(PathBuf),

    #[error("Could not check whether {path} is a git working tree: {source}")]
    RepositoryCheckFailed {
        path: PathBuf,
        #[source]
        source: GitError,
    },

    #[error("Failed to stage changes: {0}")]
    StageFailed(#[source] GitError),

    #[error("Failed to collect staged diff: {0}")]
    DiffFailed(#[source] GitError),

    #[error("Failed to generate commit message")]
    EmptyGeneratedMessage,

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] GitError),

    #[error("Commit created but push failed: {0}")]
    PushFailed(#[source] GitError),

    #[error(transparent)]
    Settings(#[from] ConfigError),
}
