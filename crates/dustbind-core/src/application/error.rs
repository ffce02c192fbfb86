//! Application layer errors.
//!
//! These cover orchestration failures: file access, extension loading, and
//! background tasks. Template compile and render failures are domain errors
//! from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// A path that had to exist does not.
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// Reading, writing, or creating a path failed.
    #[error("Filesystem error at {path}: {reason}")]
    Filesystem { path: PathBuf, reason: String },

    /// An extension manifest could not be parsed or installed.
    #[error("Extension {path} could not be loaded: {reason}")]
    Extension { path: PathBuf, reason: String },

    /// A spawned file operation panicked or was aborted.
    #[error("Background task failed: {reason}")]
    TaskFailed { reason: String },
}

impl ApplicationError {
    pub fn filesystem(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Filesystem {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { path } => vec![
                format!("Expected to find: {}", path.display()),
                "Check the configured paths".into(),
            ],
            Self::Filesystem { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that the process has read and write permissions".into(),
            ],
            Self::Extension { path, .. } => vec![
                format!("Fix or remove the manifest at {}", path.display()),
                "Manifests hold [[filter]] and [[helper]] tables".into(),
            ],
            Self::TaskFailed { .. } => vec!["Check the log for the panic message".into()],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Filesystem { .. } => ErrorCategory::Io,
            Self::Extension { .. } => ErrorCategory::Validation,
            Self::TaskFailed { .. } => ErrorCategory::Internal,
        }
    }
}
