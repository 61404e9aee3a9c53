//! Error types for courtdocs.
//!
//! Library crates use [`CourtDocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all courtdocs operations.
#[derive(Debug, thiserror::Error)]
pub enum CourtDocsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Page or document fetch failed (timeout, non-2xx status, connection error).
    #[error("transport error: {0}")]
    Transport(String),

    /// Input rejected before any network access (scheme, host allow-list, malformed request).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Payload could not be parsed as a PDF document.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CourtDocsError>;

impl CourtDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was caused by the caller's input rather than the run itself.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CourtDocsError::config("bad toml");
        assert_eq!(err.to_string(), "config error: bad toml");

        let err = CourtDocsError::validation("URL not allowed");
        assert!(err.to_string().contains("URL not allowed"));
        assert!(err.is_validation());

        let err = CourtDocsError::Transport("https://x: HTTP 503".into());
        assert!(!err.is_validation());
    }
}
