//! Error types for the syntax-test-solver library.
//!
//! Every failure of an analysis run is a [`SolverError`]. A run produces
//! either one complete [`crate::output::TestResult`] or exactly one error;
//! there is no partial-question salvage.
//!
//! Callers that show errors to a person should use
//! [`SolverError::user_message`], which collapses credential problems into a
//! single "select a valid key" message and never leaks raw model output.
//! [`SolverError::kind`] classifies the variant for callers that branch on
//! the category rather than the exact variant.

use std::path::PathBuf;
use thiserror::Error;

/// Substrings that identify a missing or rejected credential in any error
/// message, including ones passed through verbatim from the service.
pub const CREDENTIAL_FAILURE_MARKERS: [&str; 3] = [
    "API_KEY environment variable is not set",
    "Requested entity was not found",
    "API key not valid",
];

/// Message shown when a credential failure is recognised.
pub const CREDENTIAL_FAILURE_MESSAGE: &str =
    "Your API key appears to be invalid or missing. Please select a valid API key to proceed.";

/// Message shown when the service reply is not valid structured data.
pub const INVALID_FORMAT_MESSAGE: &str = "The API returned an invalid format. Please try again.";

/// Returns `true` if `message` contains one of [`CREDENTIAL_FAILURE_MARKERS`].
pub fn is_credential_failure_message(message: &str) -> bool {
    CREDENTIAL_FAILURE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Coarse classification of a [`SolverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing usable was supplied, or an input could not be read.
    Input,
    /// No credential is configured.
    AuthConfig,
    /// The service rejected the credential.
    AuthInvalid,
    /// Any other failure of the external call.
    Service,
    /// The reply did not parse as a `TestResult`.
    Parse,
    /// The session refused the action in its current state.
    Session,
    /// Configuration, export or internal failures.
    Other,
}

/// All errors returned by the syntax-test-solver library.
#[derive(Debug, Error)]
pub enum SolverError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The analyze action was triggered with an empty selection.
    #[error("Please select at least one image file.")]
    NoImages,

    /// The input string is neither a readable path, an HTTP(S) URL nor a
    /// well-formed `data:` URI.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// The image bytes could not be read, or yielded no usable data.
    #[error("Failed to read image '{name}': {reason}")]
    ReadFailed { name: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Credential errors ─────────────────────────────────────────────────
    /// No credential was configured for the model service.
    #[error("API_KEY environment variable is not set.")]
    CredentialMissing,

    /// The service rejected the configured credential. `detail` is the
    /// service message, kept verbatim.
    #[error("{detail}")]
    CredentialRejected { detail: String },

    /// The host could not open its credential-selection flow.
    #[error("Could not open the API key selection dialog. Please try again.")]
    CredentialSelection { reason: String },

    // ── Service errors ────────────────────────────────────────────────────
    /// The model service failed; the message is passed through unchanged.
    /// `status` is the HTTP status when the failure came from a reply.
    #[error("{message}")]
    Service { message: String, status: Option<u16> },

    /// The model call did not finish within the configured timeout.
    #[error("Model call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The in-flight analysis was aborted by the caller.
    #[error("Analysis was cancelled")]
    Cancelled,

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The reply text was not a valid `TestResult`. `raw` keeps the payload
    /// for diagnostics; it is deliberately absent from the message.
    #[error("The API returned an invalid format. Please try again.")]
    InvalidResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Session errors ────────────────────────────────────────────────────
    /// An analysis is already running.
    #[error("An analysis is already in progress. Wait for it to finish.")]
    Busy,

    /// No image exists at the given position of the selection.
    #[error("No selected image at position {index} (selection has {len})")]
    ImageIndexOutOfRange { index: usize, len: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the export document.
    #[error("Failed to write export file '{path}': {source}")]
    ExportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SolverError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::NoImages
            | SolverError::InvalidInput { .. }
            | SolverError::ReadFailed { .. }
            | SolverError::DownloadFailed { .. }
            | SolverError::DownloadTimeout { .. } => ErrorKind::Input,
            SolverError::CredentialMissing => ErrorKind::AuthConfig,
            SolverError::CredentialRejected { .. } => ErrorKind::AuthInvalid,
            SolverError::Service { .. } | SolverError::ApiTimeout { .. } | SolverError::Cancelled => {
                ErrorKind::Service
            }
            SolverError::InvalidResponse { .. } => ErrorKind::Parse,
            SolverError::Busy
            | SolverError::ImageIndexOutOfRange { .. }
            | SolverError::CredentialSelection { .. } => ErrorKind::Session,
            SolverError::ExportWriteFailed { .. }
            | SolverError::InvalidConfig(_)
            | SolverError::Internal(_) => ErrorKind::Other,
        }
    }

    /// Whether this error means the credential is missing or invalid.
    ///
    /// Matches on the variant first and falls back to the substring markers,
    /// so a credential failure that arrives as a plain service message is
    /// still recognised.
    pub fn is_credential_failure(&self) -> bool {
        match self.kind() {
            ErrorKind::AuthConfig | ErrorKind::AuthInvalid => true,
            ErrorKind::Service => is_credential_failure_message(&self.to_string()),
            _ => false,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SolverError::ApiTimeout { .. } => true,
            SolverError::Service {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The raw service payload, for `InvalidResponse` only.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            SolverError::InvalidResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// The single human-readable message for the top-level caller.
    pub fn user_message(&self) -> String {
        if self.is_credential_failure() {
            CREDENTIAL_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}
