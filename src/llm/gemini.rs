//! Google Gemini `generateContent` client.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Generated, MessageGenerator};
use crate::commit::prompt::build_commit_prompt;
use crate::error::GenerationError;

/// Default timeout for one generation request.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable to override the default timeout.
const TIMEOUT_ENV_VAR: &str = "AUTOCOMMIT_HTTP_TIMEOUT";

/// Longest slice of a non-JSON error body kept in the reported message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Get the configured request timeout.
///
/// Reads from AUTOCOMMIT_HTTP_TIMEOUT if set, otherwise 60 seconds. Logs a
/// warning and uses the default when the value is not a number.
fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// `{"contents":[{"parts":[{"text": ...}]}]}`
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
pub struct RequestPart {
    pub text: String,
}

impl GenerateContentRequest {
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

/// Success shape `{candidates:[{content:{parts:[{text}]}}]}`, possibly
/// carrying an `error` object instead.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Pull the first candidate's first text part out of a response.
pub fn extract_message(response: GenerateContentResponse) -> Result<String, GenerationError> {
    if let Some(error) = response.error {
        return Err(GenerationError::Service {
            status: error.code,
            message: error.message,
        });
    }

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

/// Turn a non-success response body into a service error.
fn service_error(status: u16, body: &str) -> GenerationError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        }
    };

    GenerationError::Service {
        status: Some(status),
        message,
    }
}

/// Gemini client.
///
/// The endpoint and model are fixed at construction; the API key is supplied
/// per call so a settings change applies on the next run.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl GeminiClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(get_timeout())
            .build()
            .map_err(GenerationError::Transport)?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// URL without the key; the key travels as a query parameter.
    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn request(&self, diff: &str, api_key: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest::from_prompt(build_commit_prompt(diff));

        // without_url() keeps the key out of error messages
        let response = self
            .client
            .post(self.generate_url())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url()))?;

        if !status.is_success() {
            return Err(service_error(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| GenerationError::Service {
                status: Some(status.as_u16()),
                message: format!("unparseable response: {}", e),
            })?;

        extract_message(parsed)
    }
}

#[async_trait]
impl MessageGenerator for GeminiClient {
    async fn generate(&self, diff: &str, api_key: Option<&str>, fallback: &str) -> Generated {
        let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
            return Generated::fallback(fallback, GenerationError::CredentialMissing);
        };

        debug!("Requesting commit message for {} chars of diff", diff.len());

        match self.request(diff, key).await {
            Ok(message) => Generated::ok(message),
            Err(issue) => {
                warn!("Commit message generation failed: {}", issue);
                Generated::fallback(fallback, issue)
            }
        }
    }
}
