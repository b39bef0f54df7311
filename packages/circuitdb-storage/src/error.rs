//! Error types for circuitdb-storage

use std::fmt;
use thiserror::Error;

use circuitdb_core::CircuitDbError;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading or writing the underlying file / stream
    Io,
    /// Malformed stream: bad tag, truncated data, invalid UTF-8
    Format,
    /// A serialized key does not resolve to a live handle
    Resolution,
    /// Decoded records were rejected by the snapshot
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, message)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            StorageError::format(format!("Truncated stream: {}", err)).with_source(err)
        } else {
            StorageError::io(format!("I/O error: {}", err)).with_source(err)
        }
    }
}

impl From<std::string::FromUtf8Error> for StorageError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        StorageError::format(format!("Invalid UTF-8: {}", err)).with_source(err)
    }
}

impl From<CircuitDbError> for StorageError {
    fn from(err: CircuitDbError) -> Self {
        let kind = match err {
            CircuitDbError::InvalidObjectState(_) => ErrorKind::Resolution,
            _ => ErrorKind::Validation,
        };
        StorageError::new(kind, err.to_string()).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = StorageError::format("bad node tag 9");
        assert_eq!(err.kind, ErrorKind::Format);
        assert_eq!(format!("{}", err), "[format] bad node tag 9");
        assert!(err.source.is_none());
    }

    #[test]
    fn test_truncation_is_format_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: StorageError = io_err.into();
        assert_eq!(err.kind, ErrorKind::Format);
        assert!(err.source().is_some());

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io_err.into();
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_core_error_conversion() {
        let err: StorageError = CircuitDbError::invalid_object_state("unknown cell lib:x").into();
        assert_eq!(err.kind, ErrorKind::Resolution);
        assert!(err.message.contains("lib:x"));

        let err: StorageError = CircuitDbError::invalid_argument("nodes[1] out of order").into();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::Io.as_str(), "io");
        assert_eq!(ErrorKind::Format.as_str(), "format");
        assert_eq!(ErrorKind::Resolution.as_str(), "resolution");
        assert_eq!(ErrorKind::Validation.as_str(), "validation");
    }
}
