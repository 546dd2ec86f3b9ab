//! Infrastructure adapters for Strata.
//!
//! This crate implements the ports defined in `strata_core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod clock;
pub mod environment;
pub mod filesystem;
pub mod parser;
pub mod sinks;

use std::sync::Arc;

use strata_core::application::SettingsLoader;

// Re-export commonly used adapters
pub use clock::SystemClock;
pub use environment::ProcessEnvironment;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use parser::TomlLayerParser;
pub use sinks::{JsonFileSinks, SinkWriter};

/// A loader wired to the local filesystem, TOML, the system clock and the
/// given environment snapshot and sink registry.
pub fn local_loader(environment: ProcessEnvironment, sinks: JsonFileSinks) -> SettingsLoader {
    SettingsLoader::new(
        Box::new(LocalFilesystem::new()),
        Box::new(TomlLayerParser::new()),
        Box::new(environment),
        Arc::new(SystemClock),
        Arc::new(sinks),
    )
}
