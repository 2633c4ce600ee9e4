//! Model interaction: send one request to the service and return its text.
//!
//! The service itself sits behind the [`ModelService`] trait so the solver
//! never depends on a concrete HTTP client. [`GeminiService`] is the real
//! implementation; tests inject spies.
//!
//! ## Call policy
//!
//! [`call_model`] wraps a single `generate` call with a timeout
//! (`api_timeout_secs`). Transient failures (timeout, HTTP 429, HTTP 5xx)
//! are retried up to `max_retries` times with exponential backoff
//! (`retry_backoff_ms`, doubled per retry). The default `max_retries` is 0, so a
//! run makes exactly one call. Credential failures are never retried.

use crate::config::{Credential, SolverConfig};
use crate::error::{is_credential_failure_message, SolverError};
use crate::pipeline::request::GenerateContentRequest;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// An external generative model that answers one request with one text
/// payload.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Short identifier for logs, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Send `request` and return the raw reply text.
    ///
    /// Failures should be [`SolverError::Service`] with the service's own
    /// message; the caller recognises credential problems from it.
    async fn generate(
        &self,
        credential: &Credential,
        request: &GenerateContentRequest,
    ) -> Result<String, SolverError>;
}

// ── Gemini REST client ───────────────────────────────────────────────────

/// `generateContent` over Gemini's REST API.
#[derive(Debug, Clone)]
pub struct GeminiService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiService {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, SolverError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SolverError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Full URL of the `generateContent` method for the configured model.
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl ModelService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        credential: &Credential,
        request: &GenerateContentRequest,
    ) -> Result<String, SolverError> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", credential.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| SolverError::Service {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SolverError::Service {
            message: format!("Failed to read response body: {e}"),
            status: Some(status.as_u16()),
        })?;

        if !status.is_success() {
            return Err(SolverError::Service {
                message: api_error_message(&body).unwrap_or_else(|| format!("HTTP {status}")),
                status: Some(status.as_u16()),
            });
        }

        let envelope: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| SolverError::Service {
                message: format!("Unexpected response envelope: {e}"),
                status: Some(status.as_u16()),
            })?;
        envelope.into_text()
    }
}

// ── Response envelope ────────────────────────────────────────────────────

/// The subset of a `generateContent` reply the solver reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
    /// Set on reasoning summaries, which are not part of the answer.
    #[serde(default)]
    pub thought: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the answer text of the first candidate.
    ///
    /// Only a blocked prompt, or a candidate cut off without content for a
    /// reason other than `STOP`, is a service failure. Anything else is
    /// returned as-is, even when blank, and judged by the parser.
    pub fn into_text(self) -> Result<String, SolverError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(SolverError::Service {
                message: format!("The request was blocked by the service (reason: {reason})"),
                status: None,
            });
        }

        let candidate = self.candidates.into_iter().next().unwrap_or_default();
        let Some(content) = candidate.content else {
            match candidate.finish_reason.as_deref() {
                Some(reason) if reason != "STOP" => {
                    return Err(SolverError::Service {
                        message: format!("The model returned no content (finish reason: {reason})"),
                        status: None,
                    });
                }
                _ => return Ok(String::new()),
            }
        };

        Ok(content
            .parts
            .into_iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text)
            .collect())
    }
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Pull `error.message` out of a Gemini error body.
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.trim().is_empty())
}

// ── Call policy ──────────────────────────────────────────────────────────

/// Promote a service failure whose message names a credential problem to
/// [`SolverError::CredentialRejected`]. Everything else passes through.
pub fn classify_service_error(err: SolverError) -> SolverError {
    match err {
        SolverError::Service { message, .. } if is_credential_failure_message(&message) => {
            SolverError::CredentialRejected { detail: message }
        }
        other => other,
    }
}

/// Delay before retry number `attempt` (1-based): `base_ms` doubled per
/// earlier retry, saturating at `u64::MAX`.
fn retry_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Send `request` under the configured timeout and retry policy.
pub async fn call_model(
    service: &Arc<dyn ModelService>,
    credential: &Credential,
    request: &GenerateContentRequest,
    config: &SolverConfig,
) -> Result<String, SolverError> {
    let limit = Duration::from_secs(config.api_timeout_secs);
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let backoff = retry_delay_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_request_sent(attempt);
        }
        info!("Calling {} (attempt {})", service.name(), attempt + 1);
        let start = Instant::now();

        let outcome = match timeout(limit, service.generate(credential, request)).await {
            Ok(result) => result.map_err(classify_service_error),
            Err(_) => Err(SolverError::ApiTimeout {
                secs: config.api_timeout_secs,
            }),
        };

        match outcome {
            Ok(text) => {
                debug!(
                    "{} replied with {} chars in {:?}",
                    service.name(),
                    text.len(),
                    start.elapsed()
                );
                return Ok(text);
            }
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                warn!("Attempt {} failed — {}", attempt + 1, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
