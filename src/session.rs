//! Interactive session state: selected images, current view, last outcome.
//!
//! A [`Session`] is what a front end (the CLI, or a GUI host) drives. It owns
//! no network code itself; [`Session::analyze`] hands the current selection
//! to a [`Solver`] and records whatever comes back. While an analysis is in
//! flight the session is busy and refuses a second run and any change to the
//! selection.

use crate::error::{SolverError, CREDENTIAL_FAILURE_MESSAGE};
use crate::output::TestResult;
use crate::pipeline::input::UploadedImage;
use crate::present::ViewMode;
use crate::solver::Solver;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// The environment's credential-selection facility.
#[async_trait]
pub trait CredentialHost: Send + Sync {
    /// Whether the host currently has a credential selected.
    async fn has_selected_key(&self) -> Result<bool, SolverError>;

    /// Open the host's credential-selection flow.
    async fn open_select_key(&self) -> Result<(), SolverError>;
}

#[derive(Debug, Default)]
struct SessionState {
    credential_selected: bool,
    images: Vec<UploadedImage>,
    busy: bool,
    result: Option<TestResult>,
    error: Option<String>,
    view_mode: ViewMode,
}

/// Front-end state for one user session.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

/// Clears the busy flag on every exit from [`Session::analyze`], including
/// when the future is dropped mid-flight.
struct BusyGuard<'a> {
    session: &'a Session,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.session.state().busy = false;
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Credential ───────────────────────────────────────────────────────

    /// Ask the host whether a credential is selected and remember the answer.
    /// A host error is logged and counts as "not selected".
    pub async fn check_credential(&self, host: &dyn CredentialHost) -> bool {
        let selected = match host.has_selected_key().await {
            Ok(selected) => selected,
            Err(e) => {
                warn!("Credential check failed: {}", e);
                false
            }
        };
        self.state().credential_selected = selected;
        selected
    }

    /// Run the host's selection flow.
    pub async fn select_credential(&self, host: &dyn CredentialHost) -> Result<(), SolverError> {
        match host.open_select_key().await {
            Ok(()) => {
                // Optimistic: the host is not queried again after the flow
                // returns. A key that turns out to be bad is caught on the
                // next analysis, which resets this flag.
                let mut state = self.state();
                state.credential_selected = true;
                state.error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Credential selection failed: {}", e);
                let err = match e {
                    SolverError::CredentialSelection { .. } => e,
                    other => SolverError::CredentialSelection {
                        reason: other.to_string(),
                    },
                };
                self.state().error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn credential_selected(&self) -> bool {
        self.state().credential_selected
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Append images to the selection, keeping their order.
    pub fn add_images(&self, images: impl IntoIterator<Item = UploadedImage>) -> Result<(), SolverError> {
        let mut state = self.state();
        if state.busy {
            return Err(SolverError::Busy);
        }
        state.images.extend(images);
        state.error = None;
        Ok(())
    }

    /// Remove and return the image at `index`.
    pub fn remove_image(&self, index: usize) -> Result<UploadedImage, SolverError> {
        let mut state = self.state();
        if state.busy {
            return Err(SolverError::Busy);
        }
        let len = state.images.len();
        if index >= len {
            return Err(SolverError::ImageIndexOutOfRange { index, len });
        }
        Ok(state.images.remove(index))
    }

    pub fn clear_images(&self) -> Result<(), SolverError> {
        let mut state = self.state();
        if state.busy {
            return Err(SolverError::Busy);
        }
        state.images.clear();
        Ok(())
    }

    /// Names of the selected images, in order.
    pub fn image_names(&self) -> Vec<String> {
        self.state().images.iter().map(|i| i.name.clone()).collect()
    }

    pub fn image_count(&self) -> usize {
        self.state().images.len()
    }

    // ── View ─────────────────────────────────────────────────────────────

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.state().view_mode = mode;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.state().view_mode
    }

    // ── Outcome ──────────────────────────────────────────────────────────

    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    pub fn result(&self) -> Option<TestResult> {
        self.state().result.clone()
    }

    /// The message of the last failure, if the last action failed.
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Analyse the current selection with `solver`.
    ///
    /// Nothing is sent unless a credential is selected: without one the
    /// credential message is stored and [`SolverError::CredentialMissing`]
    /// returned. The previous result and error are cleared first. On success
    /// the new result is stored and returned. On failure the user-facing message is
    /// stored and the error returned; a credential failure also resets
    /// [`Session::credential_selected`].
    pub async fn analyze(&self, solver: &Solver) -> Result<TestResult, SolverError> {
        let images = {
            let mut state = self.state();
            if state.busy {
                return Err(SolverError::Busy);
            }
            if !state.credential_selected {
                state.error = Some(CREDENTIAL_FAILURE_MESSAGE.to_string());
                return Err(SolverError::CredentialMissing);
            }
            if state.images.is_empty() {
                let err = SolverError::NoImages;
                state.error = Some(err.user_message());
                return Err(err);
            }
            state.busy = true;
            state.result = None;
            state.error = None;
            state.images.clone()
        };
        let _guard = BusyGuard { session: self };

        let outcome = solver.analyze(images).await;

        let mut state = self.state();
        match outcome {
            Ok(result) => {
                info!("Session stored result with {} question(s)", result.questions.len());
                state.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                if e.is_credential_failure() {
                    state.credential_selected = false;
                    state.error = Some(CREDENTIAL_FAILURE_MESSAGE.to_string());
                } else {
                    state.error = Some(e.user_message());
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credential, SolverConfig};
    use crate::output::fixtures;
    use crate::pipeline::llm::ModelService;
    use crate::pipeline::request::GenerateContentRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedService {
        reply: Result<String, (String, Option<u16>)>,
        calls: AtomicUsize,
    }

    impl FixedService {
        fn ok(text: String) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err((message.to_string(), None)),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelService for FixedService {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(
            &self,
            _credential: &Credential,
            _request: &GenerateContentRequest,
        ) -> Result<String, SolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err((message, status)) => Err(SolverError::Service {
                    message: message.clone(),
                    status: *status,
                }),
            }
        }
    }

    struct StubHost {
        selected: Result<bool, ()>,
        open_ok: bool,
    }

    #[async_trait]
    impl CredentialHost for StubHost {
        async fn has_selected_key(&self) -> Result<bool, SolverError> {
            self.selected
                .map_err(|_| SolverError::Internal("host unavailable".into()))
        }

        async fn open_select_key(&self) -> Result<(), SolverError> {
            if self.open_ok {
                Ok(())
            } else {
                Err(SolverError::Internal("dialog failed".into()))
            }
        }
    }

    fn solver_with(service: Arc<FixedService>) -> Solver {
        let config = SolverConfig::builder()
            .api_key("test-key")
            .service(service)
            .build()
            .unwrap();
        Solver::new(config).unwrap()
    }

    /// A session whose host reported a selected credential.
    async fn selected_session() -> Session {
        let session = Session::new();
        session.select_credential(&SELECTED_HOST).await.unwrap();
        session
    }

    const SELECTED_HOST: StubHost = StubHost {
        selected: Ok(true),
        open_ok: true,
    };

    fn image(name: &str) -> UploadedImage {
        UploadedImage::new(name, "image/png", vec![1, 2, 3])
    }

    fn valid_reply() -> String {
        serde_json::to_string(&fixtures::result(&[2, 1])).unwrap()
    }

    #[tokio::test]
    async fn analyze_stores_result() {
        let service = FixedService::ok(valid_reply());
        let solver = solver_with(service.clone());
        let session = selected_session().await;
        session.add_images([image("a.png"), image("b.png")]).unwrap();

        let r = session.analyze(&solver).await.unwrap();
        assert_eq!(r.questions.len(), 2);
        assert_eq!(session.result(), Some(r));
        assert_eq!(session.error(), None);
        assert!(!session.is_busy());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_images_records_message_without_call() {
        let service = FixedService::ok(valid_reply());
        let solver = solver_with(service.clone());
        let session = selected_session().await;

        let err = session.analyze(&solver).await.unwrap_err();
        assert!(matches!(err, SolverError::NoImages));
        assert_eq!(
            session.error().as_deref(),
            Some("Please select at least one image file.")
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_key_resets_credential_state() {
        let solver = solver_with(FixedService::failing(
            "API key not valid. Please pass a valid API key.",
        ));
        let session = Session::new();
        let host = StubHost {
            selected: Ok(true),
            open_ok: true,
        };
        session.select_credential(&host).await.unwrap();
        session.add_images([image("a.png")]).unwrap();

        session.analyze(&solver).await.unwrap_err();
        assert!(!session.credential_selected());
        assert_eq!(session.error().as_deref(), Some(CREDENTIAL_FAILURE_MESSAGE));
        assert!(session.result().is_none());
    }

    #[tokio::test]
    async fn analyze_without_selected_credential_sends_nothing() {
        let service = FixedService::ok(valid_reply());
        let solver = solver_with(service.clone());
        let session = Session::new();
        session.add_images([image("a.png")]).unwrap();

        let err = session.analyze(&solver).await.unwrap_err();
        assert!(matches!(err, SolverError::CredentialMissing));
        assert_eq!(session.error().as_deref(), Some(CREDENTIAL_FAILURE_MESSAGE));
        assert!(!session.is_busy());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_key_blocks_runs_until_reselected() {
        let service = FixedService::failing("API key not valid. Please pass a valid API key.");
        let solver = solver_with(service.clone());
        let session = selected_session().await;
        session.add_images([image("a.png")]).unwrap();

        session.analyze(&solver).await.unwrap_err();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);

        let err = session.analyze(&solver).await.unwrap_err();
        assert!(matches!(err, SolverError::CredentialMissing));
        assert_eq!(session.error().as_deref(), Some(CREDENTIAL_FAILURE_MESSAGE));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);

        session.select_credential(&SELECTED_HOST).await.unwrap();
        session.analyze(&solver).await.unwrap_err();
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn network_failure_keeps_credential_state() {
        let solver = solver_with(FixedService::failing("network timeout"));
        let session = Session::new();
        session
            .select_credential(&StubHost {
                selected: Ok(true),
                open_ok: true,
            })
            .await
            .unwrap();
        session.add_images([image("a.png")]).unwrap();

        session.analyze(&solver).await.unwrap_err();
        assert!(session.credential_selected());
        assert_eq!(session.error().as_deref(), Some("network timeout"));
    }

    #[tokio::test]
    async fn new_run_clears_previous_outcome() {
        let session = selected_session().await;
        session.add_images([image("a.png")]).unwrap();
        session
            .analyze(&solver_with(FixedService::failing("boom")))
            .await
            .unwrap_err();
        assert!(session.error().is_some());

        session
            .analyze(&solver_with(FixedService::ok(valid_reply())))
            .await
            .unwrap();
        assert!(session.error().is_none());
        assert!(session.result().is_some());
    }

    #[tokio::test]
    async fn selection_refused_while_busy() {
        let session = Session::new();
        session.add_images([image("a.png")]).unwrap();
        session.state().busy = true;

        assert!(matches!(session.add_images([image("b.png")]), Err(SolverError::Busy)));
        assert!(matches!(session.remove_image(0), Err(SolverError::Busy)));
        assert!(matches!(session.clear_images(), Err(SolverError::Busy)));
        let solver = solver_with(FixedService::ok(valid_reply()));
        assert!(matches!(session.analyze(&solver).await, Err(SolverError::Busy)));
        assert_eq!(session.image_count(), 1);
    }

    #[test]
    fn remove_and_clear_images() {
        let session = Session::new();
        session
            .add_images([image("a.png"), image("b.png"), image("c.png")])
            .unwrap();
        let removed = session.remove_image(1).unwrap();
        assert_eq!(removed.name, "b.png");
        assert_eq!(session.image_names(), vec!["a.png", "c.png"]);
        assert!(matches!(
            session.remove_image(5),
            Err(SolverError::ImageIndexOutOfRange { index: 5, len: 2 })
        ));
        session.clear_images().unwrap();
        assert_eq!(session.image_count(), 0);
    }

    #[test]
    fn check_credential_treats_host_error_as_unselected() {
        let session = Session::new();
        let host = StubHost {
            selected: Err(()),
            open_ok: true,
        };
        assert!(!tokio_test::block_on(session.check_credential(&host)));
        assert!(!session.credential_selected());

        let host = StubHost {
            selected: Ok(true),
            open_ok: true,
        };
        assert!(tokio_test::block_on(session.check_credential(&host)));
    }

    #[test]
    fn failed_selection_records_dialog_message() {
        let session = Session::new();
        let host = StubHost {
            selected: Ok(false),
            open_ok: false,
        };
        let err = tokio_test::block_on(session.select_credential(&host)).unwrap_err();
        assert!(matches!(err, SolverError::CredentialSelection { .. }));
        assert_eq!(
            session.error().as_deref(),
            Some("Could not open the API key selection dialog. Please try again.")
        );
        assert!(!session.credential_selected());
    }

    #[test]
    fn view_mode_is_local_state() {
        let session = Session::new();
        assert_eq!(session.view_mode(), ViewMode::English);
        session.set_view_mode(ViewMode::Solution);
        assert_eq!(session.view_mode(), ViewMode::Solution);
    }
}
