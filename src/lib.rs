//! # syntax-test-solver
//!
//! Turn photos of an English syntax test into a bilingual study aid.
//!
//! Photographed test pages are sent, in order, to a multimodal model together
//! with a fixed instruction and a response schema. The model transcribes every
//! question, translates it into Vietnamese and writes a step-by-step solution
//! in both languages. The reply is parsed into a [`TestResult`] which can be
//! rendered in three views or exported as a Word-compatible HTML document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images (paths / URLs / data URIs)
//!  │
//!  ├─ 1. Input    resolve each input into bytes + media type
//!  ├─ 2. Encode   bytes → base64 inline parts (order preserved)
//!  ├─ 3. Request  instructions + parts + response schema
//!  ├─ 4. Model    one generateContent call (timeout, optional retry)
//!  ├─ 5. Parse    JSON text → TestResult
//!  └─ 6. Present  english / vietnamese / solution views, HTML export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use syntax_test_solver::{
//!     export_html, render_view, Solver, SolverConfig, SolverConfigBuilder, ViewMode,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential from GEMINI_API_KEY or API_KEY
//!     let config = SolverConfigBuilder::from_config(SolverConfig::from_env())
//!         .api_timeout_secs(90)
//!         .build()?;
//!     let solver = Solver::new(config)?;
//!     let result = solver.analyze_inputs(&["page1.jpg", "page2.jpg"]).await?;
//!     println!("{}", render_view(&result, ViewMode::Solution));
//!     std::fs::write("test-review.doc", export_html(&result))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `syntest` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! syntax-test-solver = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod prompts;
pub mod schema;
pub mod session;
pub mod solver;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Credential, SolverConfig, SolverConfigBuilder, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::{ErrorKind, SolverError};
pub use export::{export_html, write_export, EXPORT_FILE_NAME, EXPORT_MIME_TYPE};
pub use output::{Question, QuestionContent, SolutionContent, TestResult};
pub use pipeline::encode::{encode_image, EncodedImagePart};
pub use pipeline::input::UploadedImage;
pub use pipeline::llm::{GeminiService, ModelService};
pub use pipeline::request::GenerateContentRequest;
pub use present::{render_view, ViewMode};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schema::response_schema;
pub use session::{CredentialHost, Session};
pub use solver::Solver;
