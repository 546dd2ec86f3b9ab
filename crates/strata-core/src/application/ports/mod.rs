//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `strata-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File reads, directory listing, skeleton writes
//!   - `LayerParser`: Layer document and override value parsing
//!   - `EnvironmentSource`: Process environment (optionally `.env`-seeded)
//!   - `LogSinks`: Structured log file registry
//!   - `Clock` (from the domain): Current time for template helpers

pub mod output;

pub use crate::domain::Clock;
pub use output::{EnvironmentSource, Filesystem, LayerParser, LogSinks};

#[cfg(test)]
pub use crate::domain::clock::MockClock;
#[cfg(test)]
pub use output::{MockEnvironmentSource, MockFilesystem, MockLayerParser, MockLogSinks};
