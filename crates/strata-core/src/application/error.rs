//! Application layer errors.
//!
//! These errors represent failures in orchestration (reading layers, writing
//! files, registering sinks), not settings semantics. Those are `DomainError`
//! from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A settings file could not be found, read, or parsed.
    #[error("Failed to load settings from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    /// The load request itself is unusable.
    #[error("Invalid load request: {0}")]
    InvalidRequest(String),

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// A structured log sink could not be attached.
    #[error("Cannot attach log sink at {path}: {reason}")]
    SinkAttach { path: PathBuf, reason: String },

    /// Registry access failed (lock poisoned).
    #[error("Sink registry is unavailable")]
    StoreLockError,

    /// Settings skeleton already present at target location.
    #[error("Settings already exist at {path}")]
    SettingsExist { path: PathBuf },

    /// Rollback failed (best-effort cleanup failed).
    #[error("Rollback failed for {path}: {reason}")]
    RollbackFailed { path: PathBuf, reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ConfigLoad { path, .. } => vec![
                format!("Check that '{}' exists and is valid TOML", path.display()),
                "Create a default settings file with: strata init".into(),
            ],
            Self::InvalidRequest(reason) => vec![
                format!("Request rejected: {reason}"),
                "Pass --prefix to set the environment variable prefix".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Ensure the parent directory exists".into(),
            ],
            Self::SinkAttach { path, .. } => vec![
                format!("Could not open '{}' for appending", path.display()),
                "Check the 'log_dir' setting and directory permissions".into(),
                "Console logging is unaffected".into(),
            ],
            Self::StoreLockError => vec![
                "The sink registry is locked".into(),
                "Try again in a moment".into(),
            ],
            Self::SettingsExist { path } => vec![
                format!("File already exists: {}", path.display()),
                "Use --force to overwrite (destructive)".into(),
            ],
            Self::RollbackFailed { .. } => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigLoad { .. } | Self::InvalidRequest(_) => ErrorCategory::Configuration,
            Self::FilesystemError { .. } | Self::RollbackFailed { .. } => ErrorCategory::Internal,
            Self::SinkAttach { .. } | Self::StoreLockError => ErrorCategory::Internal,
            Self::SettingsExist { .. } => ErrorCategory::Validation,
        }
    }
}
