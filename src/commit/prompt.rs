//! Prompt construction for commit message generation.

/// Instruction placed in front of the staged diff.
pub const PROMPT_PREFIX: &str =
    "Generate a short, specific, and professional Git commit message for the following diff:";

/// Build the generation prompt for a staged diff.
pub fn build_commit_prompt(diff: &str) -> String {
    format!("{PROMPT_PREFIX}\n\n{diff}")
}
