//! Commit message generation via a remote LLM.

pub mod gemini;

use async_trait::async_trait;

use crate::error::GenerationError;

pub use gemini::{GeminiClient, GenerateContentRequest, GenerateContentResponse, extract_message};

/// Result of a generation attempt.
///
/// Generation never fails outright: on any problem `message` holds the
/// fallback and `issue` says what went wrong so the caller can surface it.
#[derive(Debug)]
pub struct Generated {
    pub message: String,
    pub issue: Option<GenerationError>,
}

impl Generated {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issue: None,
        }
    }

    pub fn fallback(fallback: &str, issue: GenerationError) -> Self {
        Self {
            message: fallback.to_string(),
            issue: Some(issue),
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.issue.is_some()
    }
}

/// Produces a candidate commit message from a staged diff.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, diff: &str, api_key: Option<&str>, fallback: &str) -> Generated;
}
