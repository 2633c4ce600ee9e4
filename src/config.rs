//! Configuration types for an analysis run.
//!
//! All solver behaviour is controlled through [`SolverConfig`], built via its
//! [`SolverConfigBuilder`]. The credential lives here too: it is set once when
//! the config is built and read-only afterwards, so nothing in the library
//! consults process-global state after construction.

use crate::error::SolverError;
use crate::pipeline::llm::ModelService;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint (without the `/models/...` suffix).
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted, in order, by [`SolverConfig::from_env`].
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Environment variable overriding the model in [`SolverConfig::from_env`].
pub const MODEL_ENV_VAR: &str = "SYNTEST_MODEL";

/// An API key for the model service. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key. Surrounding whitespace is trimmed; an empty key yields `None`.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The key itself, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Configuration for the [`crate::Solver`].
///
/// Built via [`SolverConfig::builder()`], [`SolverConfig::from_env()`] or
/// [`SolverConfig::default()`].
///
/// # Example
/// ```rust
/// use syntax_test_solver::SolverConfig;
///
/// let config = SolverConfig::builder()
///     .api_key("my-key")
///     .model("gemini-2.5-flash")
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SolverConfig {
    /// Credential for the model service. `None` makes every analysis fail
    /// with [`SolverError::CredentialMissing`] before any network call.
    pub credential: Option<Credential>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// REST endpoint root. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Custom instruction text. If None, uses [`crate::prompts::DEFAULT_INSTRUCTIONS`].
    pub instructions: Option<String>,

    /// Sampling temperature. If None, the service default applies.
    pub temperature: Option<f32>,

    /// Upper bound on one model call, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Retries on a transient failure (timeout, HTTP 429/5xx). Default: 0,
    /// i.e. exactly one attempt.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Pre-constructed model service. Takes precedence over the built-in
    /// Gemini client.
    pub service: Option<Arc<dyn ModelService>>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            credential: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            instructions: None,
            temperature: None,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            max_retries: 0,
            retry_backoff_ms: 500,
            service: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfig")
            .field("credential", &self.credential)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("instructions", &self.instructions.as_ref().map(|s| s.len()))
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("service", &self.service.as_ref().map(|_| "<dyn ModelService>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl SolverConfig {
    /// Create a new builder for `SolverConfig`.
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus whatever the environment provides: the credential from
    /// the first non-empty of [`CREDENTIAL_ENV_VARS`], and the model from
    /// [`MODEL_ENV_VAR`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.credential = CREDENTIAL_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(Credential::new));
        if let Ok(model) = std::env::var(MODEL_ENV_VAR) {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        config
    }
}

/// Builder for [`SolverConfig`].
pub struct SolverConfigBuilder {
    config: SolverConfig,
}

impl fmt::Debug for SolverConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SolverConfigBuilder {
    /// Start from an existing config, e.g. [`SolverConfig::from_env`].
    pub fn from_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn credential(mut self, credential: Option<Credential>) -> Self {
        self.config.credential = credential;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.credential = Credential::new(key);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.config.instructions = Some(text.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn service(mut self, service: Arc<dyn ModelService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SolverConfig, SolverError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(SolverError::InvalidConfig("Model must not be empty".into()));
        }
        if c.endpoint.trim().is_empty() {
            return Err(SolverError::InvalidConfig("Endpoint must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(SolverError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(SolverError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_single_shot() {
        let c = SolverConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.max_retries, 0);
        assert!(c.credential.is_none());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = SolverConfig::builder().api_key("super-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn blank_key_is_no_credential() {
        assert!(Credential::new("   ").is_none());
        assert_eq!(Credential::new(" k ").unwrap().expose(), "k");
    }

    #[test]
    fn endpoint_trailing_slash_trimmed() {
        let c = SolverConfig::builder()
            .endpoint("http://localhost:8080/v1beta/")
            .build()
            .unwrap();
        assert_eq!(c.endpoint, "http://localhost:8080/v1beta");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = SolverConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, SolverError::InvalidConfig(_)));
    }

    #[test]
    fn empty_model_rejected() {
        assert!(SolverConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = SolverConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }
}
