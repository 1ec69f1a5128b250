//! Error types for the note store.
//!
//! Every backend reports failures through [`StoreError`]. Each variant maps
//! to a stable machine-readable code via [`StoreError::kind`], which the HTTP
//! layer and CLI use to pick a status code or exit message.

use thiserror::Error;

/// Result type alias using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure kinds produced by [`ContentStore`](crate::store::ContentStore)
/// operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The path does not exist, or names a directory where a file was expected.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The path escapes the store root, is absolute, or is empty.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Network, auth, or rate-limit failure talking to the remote service.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The active backend does not implement this operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A remote write or delete lacks the current revision token.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The stored bytes are not valid UTF-8 text.
    #[error("Invalid content: {0} is not valid UTF-8 text")]
    InvalidContent(String),

    /// Local filesystem failure other than a missing path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Stable snake-case code for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::InvalidPath(_) => "invalid_path",
            StoreError::BackendUnavailable(_) => "backend_unavailable",
            StoreError::Unsupported(_) => "unsupported",
            StoreError::Conflict(_) => "conflict",
            StoreError::InvalidContent(_) => "invalid_content",
            StoreError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::BackendUnavailable(e.to_string())
    }
}
