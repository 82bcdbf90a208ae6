//! Error types for PageGrade.
//!
//! Library crates use [`GradeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Propagation policy:
//! - [`GradeError::Config`] is fatal and raised at catalog/config load time.
//! - [`EvaluatorError`] stays inside the engine: a failing evaluator turns
//!   into a partial report, never into an `Err` for the caller.
//! - [`GradeError::Timeout`] is terminal for the single run that hit it.

use std::path::PathBuf;

use crate::types::Category;

/// Top-level error type for all PageGrade operations.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    /// Malformed or inconsistent configuration or rule catalog.
    #[error("config error: {message}")]
    Config { message: String },

    /// One category's evaluator failed on a document.
    #[error("evaluator error in {category}: {source}")]
    Evaluator {
        category: Category,
        source: EvaluatorError,
    },

    /// The evaluation fan-out exceeded the caller's deadline.
    #[error("compliance run timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Report export error.
    #[error("export error: {0}")]
    Export(String),

    /// A batch task was cancelled or panicked before producing a report.
    #[error("run cancelled: {0}")]
    Cancelled(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GradeError>;

impl GradeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Create an export error from any displayable message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}

impl From<serde_json::Error> for GradeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Failure of a single category evaluator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluatorError {
    /// A rule from another category was handed to this evaluator.
    #[error("rule '{rule_id}' belongs to {actual}, not {expected}")]
    RuleMismatch {
        rule_id: String,
        expected: Category,
        actual: Category,
    },

    /// The document holds a value no well-formed page can have.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The evaluator task panicked or was cancelled.
    #[error("evaluator aborted: {0}")]
    Aborted(String),
}

impl EvaluatorError {
    /// Create a malformed-document error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = GradeError::config("category weights sum to 95");
        assert_eq!(err.to_string(), "config error: category weights sum to 95");

        let err = GradeError::Timeout { elapsed_ms: 250 };
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn evaluator_error_names_both_categories() {
        let err = EvaluatorError::RuleMismatch {
            rule_id: "csp".into(),
            expected: Category::Seo,
            actual: Category::Security,
        };
        let msg = err.to_string();
        assert!(msg.contains("csp"));
        assert!(msg.contains("security"));
        assert!(msg.contains("seo"));
    }
}
