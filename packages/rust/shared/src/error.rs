//! Error types for OrgScout.
//!
//! Library crates use [`OrgScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Budget exhaustion is deliberately not an error: it is signalled by
//! `Budget::reserve` returning `false` and callers degrade in place.

use std::path::PathBuf;

/// Top-level error type for all OrgScout operations.
#[derive(Debug, thiserror::Error)]
pub enum OrgScoutError {
    /// Configuration loading or validation error. The only error class
    /// that may abort a run before any external call.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during search, fetch, or enrichment.
    /// Retried per policy, then downgraded to missing evidence.
    #[error("transport error: {0}")]
    Transport(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// An output row that does not fit its frozen segment schema.
    /// Fatal for the record, never for the run.
    #[error("schema violation: {message}")]
    Schema { message: String },

    /// Ledger store error (load or upsert).
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Firmographics enrichment error (API or response parsing).
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown signal name, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OrgScoutError>;

impl OrgScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a schema-violation error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Whether this error is transport-shaped and eligible for retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = OrgScoutError::config("target_count must be at least 1");
        assert_eq!(err.to_string(), "config error: target_count must be at least 1");

        let err = OrgScoutError::validation("unknown signal name: ehr_activity");
        assert!(err.to_string().contains("ehr_activity"));
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(OrgScoutError::Transport("timeout".into()).is_retryable());
        assert!(!OrgScoutError::config("bad").is_retryable());
        assert!(!OrgScoutError::schema("short row").is_retryable());
    }
}
