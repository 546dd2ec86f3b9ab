//! Application layer for Strata.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (SettingsLoader, InitService)
//! - **Settings**: The resolved, queryable settings store
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! Settings semantics (merging, environments, templates) live in
//! `crate::domain`; this layer wires them to files, variables and sinks.

pub mod error;
pub mod ports;
pub mod services;
pub mod settings;

pub use services::{
    InitReport, InitRequest, InitService, Injected, LoadRequest, SettingsLoader, env_prefix_for,
};
pub use settings::{Settings, SinkAttachment};

// Re-export port traits (for adapter implementation)
pub use ports::{Clock, EnvironmentSource, Filesystem, LayerParser, LogSinks};

pub use error::ApplicationError;
