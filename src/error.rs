//! Error types for the gyoukaku library.
//!
//! Hard errors (I/O, CSV decoding, bad reference tables) are `Error`.
//! Per-file problems met while building masters are not errors: they are
//! collected as [`FileFailure`] values so a run can continue past them.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for gyoukaku operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Reference tables are inconsistent or unreadable
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV decoding or encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Why a single source file did not contribute (fully) to the masters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// No filename token maps the file to a layout year
    UnrecognizedLayout,
    /// The file could not be read or decoded as a sheet
    MalformedSource,
    /// A column the run depends on is absent
    MissingColumn,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::UnrecognizedLayout => "UnrecognizedLayout",
            FailureKind::MalformedSource => "MalformedSource",
            FailureKind::MissingColumn => "MissingColumn",
        };
        f.write_str(name)
    }
}

/// A per-file failure recorded for end-of-run reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FileFailure {
    pub fn new(file: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        FileFailure {
            file: file.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.file, self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("duplicate org id 3".into());
        assert_eq!(err.to_string(), "Configuration error: duplicate org id 3");
    }

    #[test]
    fn test_failure_display() {
        let failure = FileFailure::new(
            "database1999.csv",
            FailureKind::UnrecognizedLayout,
            "no filename token matched",
        );
        assert_eq!(
            failure.to_string(),
            "database1999.csv [UnrecognizedLayout]: no filename token matched"
        );
    }
}
