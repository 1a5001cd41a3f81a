//! Cleanup of raw model output into a single commit message argument.

use std::sync::LazyLock;

use regex_lite::Regex;

const FENCE: &str = "```";

static ETA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[ETA:.*?\]").expect("ETA pattern is valid"));

/// Normalize a generated message.
///
/// Strips a leading and a trailing fenced-code-block marker line (models
/// sometimes wrap the whole answer in one), removes every `[ETA: ...]`
/// annotation, and trims. Never fails; empty input gives an empty string,
/// which callers treat as "no message produced".
pub fn sanitize_message(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.trim().split('\n').collect();

    if lines.first().is_some_and(|l| l.starts_with(FENCE)) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.starts_with(FENCE)) {
        lines.pop();
    }

    let joined = lines.join("\n");
    ETA_PATTERN.replace_all(&joined, "").trim().to_string()
}

/// Replace every double quote with a single quote.
///
/// Lossy on purpose: the message is handed to `git commit -m` and must not
/// carry a double quote across the process boundary.
pub fn escape_quotes(message: &str) -> String {
    message.replace('"', "'")
}
