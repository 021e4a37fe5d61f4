//! Error types for the loopscan library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using loopscan's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the collaborators around the analysis core.
///
/// The core itself never fails: every anomaly found while building or
/// analyzing the graph is reported as a finding instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Snapshot file could not be interpreted.
    #[error("Snapshot error in {path}: {message}")]
    Snapshot { path: PathBuf, message: String },

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Findings were reported and the caller asked to fail on them (CI gate).
    #[error("{count} finding(s) reported")]
    FindingsPresent { count: usize },
}

impl Error {
    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new snapshot error.
    pub fn snapshot(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("bad value");
        assert_eq!(err.to_string(), "Configuration error: bad value");

        let err = Error::FileNotFound {
            path: PathBuf::from("snapshot.json"),
        };
        assert_eq!(err.to_string(), "File not found: snapshot.json");
    }

    #[test]
    fn test_snapshot_error() {
        let err = Error::snapshot("dump.yaml", "unsupported extension");
        assert_eq!(
            err.to_string(),
            "Snapshot error in dump.yaml: unsupported extension"
        );
    }

    #[test]
    fn test_findings_present() {
        let err = Error::FindingsPresent { count: 3 };
        match err {
            Error::FindingsPresent { count } => assert_eq!(count, 3),
            _ => panic!("Expected FindingsPresent"),
        }
    }
}
