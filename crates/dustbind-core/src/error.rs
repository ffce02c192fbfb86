//! Unified error handling for dustbind.
//!
//! [`DustError`] wraps the domain and application errors so hosts deal with
//! one type, with a category and actionable suggestions attached.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{self, CompileError, DomainError, RenderError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DustError {
    /// Template source that does not compile.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// A render that had to abort.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Invalid extension definitions or patterns.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// File access and orchestration failures.
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// Engine settings of the wrong shape.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl DustError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Compile(e) => vec![
                format!("Check line {}, column {} of '{}'", e.line, e.column, e.template),
                "Every {#section} needs a matching {/section}".into(),
            ],
            Self::Render(RenderError::TemplateNotFound(name)) => vec![
                format!("Register '{name}' before rendering it"),
                "Or pass the template source to render".into(),
            ],
            Self::Render(_) => vec!["Check the helper and filter implementations".into()],
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {message}"),
                "Check the engines.dust settings".into(),
            ],
            Self::Internal { .. } => vec!["This appears to be a bug in dustbind".into()],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Compile(_) => ErrorCategory::Compile,
            Self::Render(RenderError::TemplateNotFound(_)) => ErrorCategory::NotFound,
            Self::Render(RenderError::Compile(_)) => ErrorCategory::Compile,
            Self::Render(_) => ErrorCategory::Render,
            Self::Domain(e) => match e.category() {
                domain::ErrorCategory::Validation => ErrorCategory::Validation,
                domain::ErrorCategory::Configuration => ErrorCategory::Configuration,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Error categories for host display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Io,
    Compile,
    Render,
    Validation,
    Configuration,
    Internal,
}

pub type DustResult<T> = Result<T, DustError>;
