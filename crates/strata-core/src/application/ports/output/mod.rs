//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `strata-adapters` crate provides implementations.

use std::path::{Path, PathBuf};

use crate::domain::{Setting, SettingsTable};
use crate::error::StrataResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `strata_adapters::filesystem::LocalFilesystem` (production)
/// - `strata_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Read a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> StrataResult<String>;

    /// Regular files directly inside `dir` (no recursion), in any order.
    fn list_files(&self, dir: &Path) -> StrataResult<Vec<PathBuf>>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> StrataResult<()>;

    /// Write content to a file, replacing it if present.
    fn write_file(&self, path: &Path, content: &str) -> StrataResult<()>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> StrataResult<()>;
}

/// Port for turning layer text into settings.
///
/// Implemented by `strata_adapters::parser::TomlLayerParser`.
#[cfg_attr(test, mockall::automock)]
pub trait LayerParser: Send + Sync {
    /// Parse a whole layer document. Errors are human-readable reasons.
    fn parse_document(&self, source: &str) -> Result<SettingsTable, String>;

    /// Parse a single raw override value (from an environment variable).
    ///
    /// Never fails: text that is not a valid literal is kept as a string.
    fn parse_value(&self, raw: &str) -> Setting;
}

/// Port for the (possibly `.env`-seeded) process environment.
///
/// Implemented by `strata_adapters::environment::ProcessEnvironment`.
#[cfg_attr(test, mockall::automock)]
pub trait EnvironmentSource: Send + Sync {
    /// Look up a single variable by exact name.
    fn var(&self, name: &str) -> Option<String>;

    /// Variables named `<prefix>_<KEY>`, returned as `(dotted key, raw value)`.
    ///
    /// Keys are lower-cased with the prefix stripped; `__` becomes `.`.
    fn prefixed(&self, prefix: &str) -> StrataResult<Vec<(String, String)>>;
}

/// Port for structured (JSON-lines) log file destinations.
///
/// Implemented by `strata_adapters::sinks::JsonFileSinks`.
#[cfg_attr(test, mockall::automock)]
pub trait LogSinks: Send + Sync {
    /// Register `path` as a destination.
    ///
    /// Returns `false` without side effects when `path` is already
    /// registered. Creates parent directories as needed.
    fn attach(&self, path: &Path) -> StrataResult<bool>;

    /// Currently registered destinations, in attach order.
    fn destinations(&self) -> Vec<PathBuf>;
}
