use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while
/// discovering, reading, or summarising spreadsheets.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading credential files or local workbooks.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Transport-level failure talking to the spreadsheet source.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source could not be reached or refused our credentials.
    #[error("spreadsheet source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source answered with an unexpected status.
    #[error("source API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Raised when the credential file is missing or has an unsupported shape.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// Raised when a configured value cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when a configured local folder root does not exist.
    #[error("source root not found: {0}")]
    MissingRoot(PathBuf),

    /// Raised when the tool transport fails to start or stops abnormally.
    #[error("tool transport error: {0}")]
    Transport(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Whether the error means the source itself could not be reached, as
    /// opposed to a single file being unreadable.
    pub fn is_source_unavailable(&self) -> bool {
        match self {
            ToolError::SourceUnavailable(_) | ToolError::Credentials(_) => true,
            ToolError::Http(error) => error.is_connect() || error.is_timeout(),
            ToolError::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}
