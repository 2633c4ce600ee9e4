//! The request orchestrator: images in, one [`TestResult`] (or one error) out.
//!
//! A [`Solver`] is built once from a [`SolverConfig`] and can run any number
//! of analyses. Each run goes through the same steps:
//!
//! 1. refuse an empty selection and a missing credential, before any I/O;
//! 2. encode every image concurrently, keeping selection order;
//! 3. build one request (instructions, images, response schema);
//! 4. call the model once, under the configured timeout/retry policy;
//! 5. parse the reply into a [`TestResult`].

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::output::TestResult;
use crate::pipeline::input::{self, UploadedImage};
use crate::pipeline::llm::{self, GeminiService, ModelService};
use crate::pipeline::{encode, parse, request};
use crate::prompts::DEFAULT_INSTRUCTIONS;
use crate::schema::response_schema;
use futures::future::{AbortRegistration, Abortable};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs analyses against one configured model service.
pub struct Solver {
    config: SolverConfig,
    service: Arc<dyn ModelService>,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("config", &self.config)
            .field("service", &self.service.name())
            .finish()
    }
}

impl Solver {
    /// Create a solver. Uses `config.service` when set, otherwise a
    /// [`GeminiService`] for `config.endpoint` and `config.model`.
    pub fn new(config: SolverConfig) -> Result<Self, SolverError> {
        let service: Arc<dyn ModelService> = match config.service {
            Some(ref service) => Arc::clone(service),
            None => Arc::new(GeminiService::new(&config.endpoint, &config.model)?),
        };
        Ok(Self { config, service })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Analyse an ordered selection of images.
    ///
    /// # Errors
    /// - [`SolverError::NoImages`] for an empty selection
    /// - [`SolverError::CredentialMissing`] when no credential is configured
    /// - [`SolverError::ReadFailed`] when an image has no data
    /// - [`SolverError::CredentialRejected`], [`SolverError::Service`] or
    ///   [`SolverError::ApiTimeout`] when the call fails
    /// - [`SolverError::InvalidResponse`] when the reply does not parse
    ///
    /// The first two are raised before the model service is contacted.
    pub async fn analyze(&self, images: Vec<UploadedImage>) -> Result<TestResult, SolverError> {
        let result = self.run(images).await;
        if let Some(ref cb) = self.config.progress_callback {
            match &result {
                Ok(r) => cb.on_analysis_complete(r.questions.len()),
                Err(e) => cb.on_analysis_error(&e.user_message()),
            }
        }
        result
    }

    /// Like [`Solver::analyze`], but aborts when the paired
    /// [`futures::future::AbortHandle`] fires. An aborted run yields
    /// [`SolverError::Cancelled`].
    pub async fn analyze_abortable(
        &self,
        images: Vec<UploadedImage>,
        registration: AbortRegistration,
    ) -> Result<TestResult, SolverError> {
        match Abortable::new(self.analyze(images), registration).await {
            Ok(result) => result,
            Err(_aborted) => {
                warn!("Analysis aborted by caller");
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_analysis_error(&SolverError::Cancelled.to_string());
                }
                Err(SolverError::Cancelled)
            }
        }
    }

    /// Resolve paths, URLs or data URIs, then analyse them in the given order.
    pub async fn analyze_inputs<S: AsRef<str>>(&self, inputs: &[S]) -> Result<TestResult, SolverError> {
        if inputs.is_empty() {
            return Err(SolverError::NoImages);
        }
        let images = input::resolve_inputs(inputs, self.config.download_timeout_secs).await?;
        self.analyze(images).await
    }

    async fn run(&self, images: Vec<UploadedImage>) -> Result<TestResult, SolverError> {
        let total_start = Instant::now();

        // ── Step 1: Preconditions ────────────────────────────────────────
        if images.is_empty() {
            return Err(SolverError::NoImages);
        }
        let credential = self
            .config
            .credential
            .as_ref()
            .ok_or(SolverError::CredentialMissing)?;

        info!("Starting analysis of {} image(s)", images.len());
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_analysis_start(images.len());
        }

        // ── Step 2: Encode images ────────────────────────────────────────
        let parts = encode::encode_all(images, self.config.progress_callback.as_ref()).await?;
        debug!(
            "Encoded {} image(s), {} base64 bytes total",
            parts.len(),
            parts.iter().map(|p| p.data.len()).sum::<usize>()
        );

        // ── Step 3: Build request ────────────────────────────────────────
        let instructions = self
            .config
            .instructions
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS);
        let request =
            request::build_request(instructions, parts, response_schema(), self.config.temperature);

        // ── Step 4: Call the model ───────────────────────────────────────
        let text = llm::call_model(&self.service, credential, &request, &self.config).await?;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_response_received(text.len());
        }

        // ── Step 5: Parse ────────────────────────────────────────────────
        let result = parse::parse_response(&text)?;
        info!(
            "Analysis complete: '{}', {} question(s), {}ms",
            result.title,
            result.questions.len(),
            total_start.elapsed().as_millis()
        );
        Ok(result)
    }
}
