//! Centralized error types for mailpost.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailpost library.
#[derive(Error, Debug)]
pub enum MailpostError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration file could not be read or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The message could not be parsed as RFC 5322 / MIME.
    #[error("MIME decoding error: {0}")]
    MimeError(String),

    /// The front matter block is missing or malformed.
    #[error("Front matter error: {0}")]
    FrontMatter(String),

    /// Image bytes could not be decoded or re-encoded.
    #[error("Image error for '{name}': {reason}")]
    Image { name: String, reason: String },

    /// A remote image could not be retrieved.
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },
}

/// Convenience alias for `Result<T, MailpostError>`.
pub type Result<T> = std::result::Result<T, MailpostError>;

impl MailpostError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the batch can carry on after this error.
    ///
    /// Only filesystem failures on the output side abort a batch.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::FileNotFound(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_is_fatal() {
        let err = MailpostError::io(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("/nope"));
    }

    #[test]
    fn test_decode_errors_are_recoverable() {
        let err = MailpostError::Image {
            name: "apple.jpg".into(),
            reason: "truncated".into(),
        };
        assert!(err.is_recoverable());
        let err = MailpostError::Fetch {
            url: "https://example.com/a.png".into(),
            reason: "HTTP 404".into(),
        };
        assert!(err.is_recoverable());
    }
}
