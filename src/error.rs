//! Unified error handling.
//!
//! One enum per concern, folded into [`AppError`]. The scheduler only ever
//! looks at [`AppError::is_transient`] to decide whether a failed job attempt
//! is worth retrying; everything else is carried as context for the log and
//! the per-job error string in the report.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

/// Top-level application error.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("cascade error: {0}")]
    Cascade(#[from] CascadeError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether a failed job attempt with this error is worth retrying with a
    /// fresh page. Timeouts and lost sessions are; malformed input is not.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Browser(e) => e.is_transient(),
            // selection and discovery failures during a replay are usually
            // page-state flakiness, not bad input; a fresh page often clears them
            AppError::Cascade(_) => true,
            AppError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Browser session and page interaction errors.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("failed to connect to browser on port {port}: {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to launch headless browser: {0}")]
    LaunchFailed(String),

    #[error("failed to create page: {source}")]
    PageCreationFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("navigation to {url} failed: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("script evaluation failed: {source}")]
    ScriptFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl BrowserError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::NavigationTimeout { .. }
                | BrowserError::NavigationFailed { .. }
                | BrowserError::SessionLost(_)
        )
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::ScriptFailed {
            source: Box::new(err),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(err.into())
    }
}

/// Cascade resolution errors.
///
/// Most resolution-level conditions (no controls found, zero options) are not
/// errors at all: they surface as empty results. What remains here is the
/// repopulation timeout, which is job-retryable, and selection replays that
/// could not be confirmed.
#[derive(Error, Debug)]
pub enum CascadeError {
    #[error(
        "level {level} control did not repopulate within {timeout_ms}ms after selecting '{selected}'"
    )]
    RepopulationTimeout {
        level: usize,
        selected: String,
        timeout_ms: u64,
    },

    #[error("could not confirm selection of '{label}' on level {level}")]
    SelectionUnconfirmed { level: usize, label: String },

    #[error("no control found for level {level}")]
    ControlNotFound { level: usize },
}

/// Plan and pairs-artifact errors. Malformation is fatal at load time.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("plan file not found: {path}")]
    NotFound { path: String },

    #[error("plan is malformed ({path}): {reason}")]
    Malformed { path: String, reason: String },

    #[error("plan already exists at {path} (pass overwrite to replace it)")]
    AlreadyExists { path: String },

    #[error("invalid date '{value}' (expected DD-MM-YYYY)")]
    InvalidDate { value: String },

    #[error("pairs artifact not found: {path}")]
    ArtifactNotFound { path: String },
}

/// Advisory run-lock errors.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("output directory {dir} is locked by live process {pid}")]
    Held { dir: String, pid: u32 },

    #[error("failed to write lock file: {0}")]
    WriteFailed(String),
}
