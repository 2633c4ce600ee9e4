//! Progress-callback trait for analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::SolverConfigBuilder::progress_callback`] to receive
//! events as a run moves through its stages. The CLI uses it to drive its
//! busy spinner; a GUI host could forward the same events to its own
//! indicator.
//!
//! # Example
//!
//! ```rust
//! use syntax_test_solver::{AnalysisProgressCallback, SolverConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     encoded: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_image_encoded(&self, index: usize, total: usize, encoded_len: usize) {
//!         self.encoded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("image {}/{} → {} bytes", index + 1, total, encoded_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { encoded: AtomicUsize::new(0) });
//!
//! let config = SolverConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the solver as it processes one analysis run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_image_encoded` is called as each encoding task finishes, which may be
/// out of selection order. Implementations must protect shared mutable
/// state with appropriate synchronisation primitives.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once, before any image is encoded.
    fn on_analysis_start(&self, image_count: usize) {
        let _ = image_count;
    }

    /// Called after an image has been base64-encoded.
    ///
    /// # Arguments
    /// * `index`      : 0-based position in the selection
    /// * `total`      : number of selected images
    /// * `encoded_len`: length of the base64 payload
    fn on_image_encoded(&self, index: usize, total: usize, encoded_len: usize) {
        let _ = (index, total, encoded_len);
    }

    /// Called just before the request goes out. `attempt` starts at 0.
    fn on_request_sent(&self, attempt: u32) {
        let _ = attempt;
    }

    /// Called when the service replied with text.
    fn on_response_received(&self, text_len: usize) {
        let _ = text_len;
    }

    /// Called once after the reply parsed successfully.
    fn on_analysis_complete(&self, question_count: usize) {
        let _ = question_count;
    }

    /// Called once when the run ends with an error.
    fn on_analysis_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SolverConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
