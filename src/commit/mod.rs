//! Commit runs: prompt building, message cleanup, and the run sequence.

pub mod orchestrator;
pub mod prompt;
pub mod sanitize;

pub use orchestrator::{AutoCommitter, CommitSession, PushOutcome, RunOutcome, Trigger};
pub use prompt::build_commit_prompt;
pub use sanitize::{escape_quotes, sanitize_message};
