//! Error types for quire operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while rendering a book page.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find index file from candidates: {}", candidates.join(", "))]
    IndexNotFound { candidates: Vec<String> },

    #[error("Style sheet error at {line}:{column}: {message}")]
    Style {
        line: u32,
        column: u32,
        message: String,
    },

    #[error("Font error: {0}")]
    Font(String),

    #[error("Invalid slug pattern: {0}")]
    SlugPattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach the path that was being read to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means a file did not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
