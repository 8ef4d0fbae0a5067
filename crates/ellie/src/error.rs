//! Error kinds for configuration, range resolution and per-day exports.

use thiserror::Error;

/// Export errors.
///
/// `ConfigInvalid` and `RangeUnresolved` abort the whole run. Every other
/// kind belongs to a single day and the run carries on with the rest.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    ConfigInvalid(String),

    #[error("no valid date range or export plugin: {0}")]
    RangeUnresolved(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("day {0} seems to have no segments")]
    NoSegments(String),

    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("already imported, skipped {0}")]
    DuplicateEntry(String),

    #[error("persist failed: {0}")]
    PersistFailed(String),
}

impl ExportError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExportError::ConfigInvalid(_) | ExportError::RangeUnresolved(_)
        )
    }
}

impl From<moves_client::MovesError> for ExportError {
    fn from(err: moves_client::MovesError) -> Self {
        ExportError::FetchFailed(err.to_string())
    }
}

impl From<reqwest::Error> for ExportError {
    fn from(err: reqwest::Error) -> Self {
        ExportError::FetchFailed(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::PersistFailed(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::PersistFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ExportError {
    fn from(err: toml::de::Error) -> Self {
        ExportError::ConfigInvalid(err.to_string())
    }
}

impl From<ExportError> for String {
    fn from(err: ExportError) -> Self {
        err.to_string()
    }
}

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
