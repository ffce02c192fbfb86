// ============================================================================
// domain/error.rs - TEMPLATE ENGINE ERRORS
// ============================================================================

use thiserror::Error;

/// A template source that could not be compiled.
///
/// Carries the parser diagnostic together with the position it applies to,
/// so hosts can point authors at the offending tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} in template '{template}' at line {line}, column {column}")]
pub struct CompileError {
    pub template: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl CompileError {
    pub fn new(
        template: impl Into<String>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            template: template.into(),
            message: message.into(),
            line,
            column,
        }
    }
}

/// Failures while executing a compiled template.
///
/// Unresolved helpers and partials are *not* errors; they are skipped by the
/// renderer. These variants cover everything that must abort a render.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Helper '{helper}' failed: {reason}")]
    Helper { helper: String, reason: String },

    #[error("Filter '{filter}' failed: {reason}")]
    Filter { filter: String, reason: String },

    #[error("Partial '{partial}' nested deeper than {limit} levels")]
    PartialDepth { partial: String, limit: usize },

    #[error("Helper '{helper}' nested deeper than {limit} levels")]
    HelperDepth { helper: String, limit: usize },

    /// A template compiled on the fly during rendering (dynamic partial
    /// names, uncached pages) failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl RenderError {
    pub fn helper(helper: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Helper {
            helper: helper.into(),
            reason: reason.into(),
        }
    }
}

/// Invalid settings or extension definitions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("Filter '{filter}' uses unknown step '{step}'")]
    UnknownFilterStep { filter: String, step: String },

    #[error("Filter '{filter}' has no steps")]
    EmptyFilter { filter: String },

    #[error("Helper '{helper}' template does not compile: {source}")]
    InvalidHelper {
        helper: String,
        #[source]
        source: CompileError,
    },

    #[error("Invalid whitelist pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl DomainError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidSetting { key, .. } => vec![
                format!("Check the '{key}' entry of the engine settings"),
                "Remove the key to fall back to its default".into(),
            ],
            Self::UnknownFilterStep { step, .. } => vec![
                format!("'{step}' is neither a primitive nor a registered filter"),
                "Primitives: upper, lower, trim, trim_start, trim_end, capitalize".into(),
            ],
            Self::InvalidHelper { source, .. } => vec![format!(
                "Fix line {}, column {} of the helper template",
                source.line, source.column
            )],
            Self::InvalidPattern { .. } => {
                vec!["Whitelist entries are glob patterns such as 'partials/*'".into()]
            }
            Self::EmptyFilter { .. } => vec!["Give the filter at least one step".into()],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSetting { .. } | Self::InvalidPattern { .. } => {
                ErrorCategory::Configuration
            }
            Self::UnknownFilterStep { .. } | Self::EmptyFilter { .. } | Self::InvalidHelper { .. } => {
                ErrorCategory::Validation
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Configuration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display_carries_position() {
        let err = CompileError::new("pages/home", "Expected end tag for 'items'", 3, 7);
        assert_eq!(
            err.to_string(),
            "Expected end tag for 'items' in template 'pages/home' at line 3, column 7"
        );
    }

    #[test]
    fn render_error_wraps_compile_error() {
        let err: RenderError = CompileError::new("x", "bad", 1, 1).into();
        assert!(matches!(err, RenderError::Compile(_)));
    }
}
