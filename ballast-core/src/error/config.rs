//! Configuration error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error type covering file loading, parsing, and
/// validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// A required field is missing.
    #[error("[Config] Missing field: {field}{}", .section.as_ref().map(|s| format!(" (in {s})")).unwrap_or_default())]
    MissingField {
        /// The missing field name.
        field: String,
        /// The section it was expected in, if known.
        section: Option<String>,
    },

    /// A field holds an invalid value.
    #[error("[Config] Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dot-separated field path.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// File extension not recognized as a supported format.
    #[error("[Config] Unrecognized config format: {path}")]
    InvalidFormat {
        /// The offending path.
        path: String,
    },

    /// The file could not be read.
    #[error("[Config] Failed to read {path}: {reason}")]
    Io {
        /// Path being read.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The content could not be parsed.
    #[error("[Config] Failed to parse as {format}: {reason}")]
    Parse {
        /// Format being parsed.
        format: String,
        /// Underlying parser failure.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            section: None,
        }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        super::ErrorSeverity::Fatal
    }
}
