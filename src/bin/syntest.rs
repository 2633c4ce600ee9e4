//! CLI binary for syntax-test-solver.
//!
//! A thin shim over the library crate: resolves the inputs into a
//! [`Session`], makes sure a credential is selected, runs one analysis and
//! prints the chosen view.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use syntax_test_solver::pipeline::input::resolve_inputs;
use syntax_test_solver::{
    render_view, write_export, AnalysisProgressCallback, Credential, CredentialHost,
    ProgressCallback, Session, Solver, SolverConfig, SolverConfigBuilder, SolverError, ViewMode,
    EXPORT_FILE_NAME,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Busy indicator using indicatif ───────────────────────────────────────────

/// Spinner shown while an analysis is in flight. One line per encoded image,
/// then a status message for the model call.
struct SpinnerCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl SpinnerCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for SpinnerCallback {
    fn on_analysis_start(&self, image_count: usize) {
        *self.started.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.bar.set_prefix("Encoding");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {image_count} image(s)…"))
        ));
    }

    fn on_image_encoded(&self, index: usize, total: usize, encoded_len: usize) {
        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{encoded_len:>8} base64 bytes")),
        ));
    }

    fn on_request_sent(&self, attempt: u32) {
        self.bar.set_prefix("Solving");
        if attempt == 0 {
            self.bar.set_message("Waiting for the model…");
        } else {
            self.bar.set_message(format!("Retrying (attempt {})…", attempt + 1));
        }
    }

    fn on_response_received(&self, text_len: usize) {
        self.bar.set_prefix("Parsing");
        self.bar.set_message(format!("{text_len} chars"));
    }

    fn on_analysis_complete(&self, question_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} question(s) solved  {}",
            green("✔"),
            bold(&question_count.to_string()),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        );
    }

    fn on_analysis_error(&self, _message: &str) {
        self.bar.finish_and_clear();
    }
}

// ── Credential host ──────────────────────────────────────────────────────────

/// Holds the key given by flag or environment; asks for one on stdin when
/// none was given.
struct PromptCredentialHost {
    credential: Mutex<Option<Credential>>,
}

impl PromptCredentialHost {
    fn new(credential: Option<Credential>) -> Self {
        Self {
            credential: Mutex::new(credential),
        }
    }

    fn credential(&self) -> Option<Credential> {
        self.credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl CredentialHost for PromptCredentialHost {
    async fn has_selected_key(&self) -> Result<bool, SolverError> {
        Ok(self.credential().is_some())
    }

    async fn open_select_key(&self) -> Result<(), SolverError> {
        if !io::stdin().is_terminal() {
            return Err(SolverError::CredentialSelection {
                reason: "stdin is not a terminal".into(),
            });
        }
        let line = tokio::task::spawn_blocking(|| -> io::Result<String> {
            eprint!("{} Gemini API key: ", cyan("?"));
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| SolverError::CredentialSelection {
            reason: e.to_string(),
        })?
        .map_err(|e| SolverError::CredentialSelection {
            reason: e.to_string(),
        })?;

        let credential = Credential::new(line).ok_or_else(|| SolverError::CredentialSelection {
            reason: "no key entered".into(),
        })?;
        *self.credential.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential);
        Ok(())
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Solve a two-page test, English view
  syntest page1.jpg page2.jpg

  # Bilingual solutions
  syntest --view solution scan.png

  # Vietnamese translation, export a Word document as well
  syntest --view vietnamese --export scan.png

  # Export into a directory (file is named test-review.doc)
  syntest --export=./out scan.png

  # Image from a URL, structured JSON on stdout
  syntest --json https://example.com/test-page.jpg

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  API_KEY                 Fallback API key
  SYNTEST_MODEL           Override model ID (default gemini-2.5-flash)
  RUST_LOG                Override log filter

SETUP:
  1. Set API key:     export GEMINI_API_KEY=...
  2. Solve:           syntest photo.jpg

  Without a key the CLI asks for one on stdin.
"#;

/// Solve photographed English syntax tests with bilingual explanations.
#[derive(Parser, Debug)]
#[command(
    name = "syntest",
    version,
    about = "Solve photographed English syntax tests with bilingual explanations",
    long_about = "Send photos of an English syntax test to Gemini, which transcribes every \
question, translates it into Vietnamese and explains the solution in both languages. The \
result can be shown in three views or exported as a Word-compatible document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file paths, HTTP/HTTPS URLs or base64 data URIs, in page order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Which view to print.
    #[arg(long, env = "SYNTEST_VIEW", value_enum, default_value = "english")]
    view: ViewArg,

    /// Also write the Word-compatible export. Takes `--export=PATH` (file or
    /// directory); a bare `--export` writes `test-review.doc`.
    #[arg(
        long,
        env = "SYNTEST_EXPORT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = EXPORT_FILE_NAME
    )]
    export: Option<PathBuf>,

    /// Print the parsed result as JSON instead of a view.
    #[arg(long, env = "SYNTEST_JSON")]
    json: bool,

    /// Model ID.
    #[arg(long, env = "SYNTEST_MODEL")]
    model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// REST endpoint root.
    #[arg(long, env = "SYNTEST_ENDPOINT")]
    endpoint: Option<String>,

    /// Model temperature (0.0–2.0). Service default when unset.
    #[arg(long, env = "SYNTEST_TEMPERATURE")]
    temperature: Option<f32>,

    /// Model call timeout in seconds.
    #[arg(long, env = "SYNTEST_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SYNTEST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Retries on timeout or HTTP 429/5xx.
    #[arg(long, env = "SYNTEST_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Path to a text file with replacement instructions for the model.
    #[arg(long, env = "SYNTEST_INSTRUCTIONS")]
    instructions: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long, env = "SYNTEST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SYNTEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "SYNTEST_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ViewArg {
    English,
    Vietnamese,
    Solution,
}

impl From<ViewArg> for ViewMode {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::English => ViewMode::English,
            ViewArg::Vietnamese => ViewMode::Vietnamese,
            ViewArg::Solution => ViewMode::Solution,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Session & credential ─────────────────────────────────────────────
    let session = Session::new();
    session.set_view_mode(cli.view.into());

    let initial = cli
        .api_key
        .as_deref()
        .and_then(Credential::new)
        .or_else(|| SolverConfig::from_env().credential);
    let host = PromptCredentialHost::new(initial);

    if !session.check_credential(&host).await {
        if let Err(e) = session.select_credential(&host).await {
            fail(&e.user_message());
        }
    }

    // ── Inputs ───────────────────────────────────────────────────────────
    let images = resolve_inputs(&cli.inputs, cli.download_timeout)
        .await
        .unwrap_or_else(|e| fail(&e.user_message()));
    session
        .add_images(images)
        .unwrap_or_else(|e| fail(&e.user_message()));

    // ── Build config & run ───────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(SpinnerCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let solver = build_config(&cli, host.credential(), progress_cb)
        .await
        .and_then(Solver::new)
        .unwrap_or_else(|e| fail(&e.user_message()));

    let result = match session.analyze(&solver).await {
        Ok(result) => result,
        Err(e) => fail(&session.error().unwrap_or_else(|| e.user_message())),
    };

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        let text = render_view(&result, session.view_mode());
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if let Some(ref path) = cli.export {
        let written = write_export(&result, path)
            .await
            .unwrap_or_else(|e| fail(&e.user_message()));
        if !cli.quiet {
            eprintln!(
                "{}  exported  →  {}",
                green("✔"),
                bold(&written.display().to_string())
            );
        }
    }

    Ok(())
}

/// Print the user-facing failure message and exit non-zero.
fn fail(message: &str) -> ! {
    eprintln!("{} {}", red("✘"), message);
    std::process::exit(1);
}

/// Map CLI args to `SolverConfig`.
async fn build_config(
    cli: &Cli,
    credential: Option<Credential>,
    progress: Option<ProgressCallback>,
) -> Result<SolverConfig, SolverError> {
    let instructions = if let Some(ref path) = cli.instructions {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            SolverError::InvalidConfig(format!(
                "cannot read instructions from {}: {e}",
                path.display()
            ))
        })?;
        Some(text)
    } else {
        None
    };

    let mut builder = SolverConfigBuilder::from_config(SolverConfig::from_env())
        .credential(credential)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_retries(cli.max_retries);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(text) = instructions {
        builder = builder.instructions(text);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build()
}
