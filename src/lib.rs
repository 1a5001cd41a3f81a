//! autocommit - periodically commits a workspace with AI-generated messages.
//!
//! # Overview
//!
//! autocommit stages every change in a git working tree, asks Google Gemini
//! for a commit message describing the staged diff, cleans the answer up, and
//! commits. Runs happen on demand or on a fixed interval, and can optionally
//! push to a remote whose transport authenticates without prompting.

pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod notify;
pub mod scheduler;
pub mod watch;

// Re-export commonly used types
pub use commit::{AutoCommitter, PushOutcome, RunOutcome, Trigger};
pub use config::{FileSettings, Settings, SettingsSource};
pub use error::{AutoCommitError, ConfigError, GenerationError, GitError};
pub use git::{GitCli, VersionControl};
pub use llm::{GeminiClient, MessageGenerator};
pub use notify::{ConsoleNotifier, Notifier};
pub use scheduler::Scheduler;
