// ============================================================================
// domain/error.rs - SETTINGS DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (so nested evaluation failures can be re-wrapped)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Lookup Errors (404-level equivalent)
    // ========================================================================
    #[error("key '{key}' is not defined in any layer")]
    KeyNotFound { key: String },

    // ========================================================================
    // Evaluation Errors
    // ========================================================================
    #[error("cannot evaluate '{key}': {reason}")]
    TemplateEvaluation { key: String, reason: String },

    // ========================================================================
    // Validation Errors (400-level equivalent)
    // ========================================================================
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("'{key}' holds {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("layer '{layer}' is malformed: {reason}")]
    InvalidLayer { layer: String, reason: String },

    #[error("Duplicate path in skeleton: {path}")]
    DuplicatePath { path: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::KeyNotFound { key } => vec![
                format!("Define '{key}' under [default] in a settings file"),
                "Or export it with the project prefix, e.g. PREFIX_KEY=value".into(),
                "Run 'strata list' to see every resolved key".into(),
            ],
            Self::TemplateEvaluation { reason, .. } => vec![
                format!("Evaluation failed: {reason}"),
                "Templates may reference this.<key> or the helpers now, start_time, \
                 date_partition, base_dir, home_dir, project_name"
                    .into(),
            ],
            Self::InvalidKey { .. } => vec![
                "Keys are dot-separated names such as 'database.host'".into(),
            ],
            Self::TypeMismatch { key, expected, .. } => vec![
                format!("Change '{key}' to a {expected} value"),
                "Environment values are parsed as TOML literals; quote strings explicitly".into(),
            ],
            Self::InvalidLayer { layer, .. } => vec![
                format!("Check the structure of '{layer}'"),
                "Every top-level entry must be an environment table such as [default]".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::KeyNotFound { .. } => ErrorCategory::NotFound,
            Self::TemplateEvaluation { .. } => ErrorCategory::Evaluation,
            Self::InvalidKey { .. } | Self::TypeMismatch { .. } => ErrorCategory::Validation,
            Self::InvalidLayer { .. } => ErrorCategory::Configuration,
            Self::DuplicatePath { .. } | Self::AbsolutePathNotAllowed { .. } => {
                ErrorCategory::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Evaluation,
    Configuration,
    Internal,
}
