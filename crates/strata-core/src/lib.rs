//! Strata Core - layered settings resolution
//!
//! This crate provides the domain and application layers for Strata,
//! following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           strata-cli (CLI)              │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │     (SettingsLoader, InitService)       │
//! │   produce and query a Settings store    │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │       Application Ports (Traits)        │
//! │ (Filesystem, LayerParser, Environment-  │
//! │  Source, LogSinks, Clock)               │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     strata-adapters (Infrastructure)    │
//! │ (LocalFilesystem, TomlLayerParser, ...) │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │   (Value, Layer, Template, Helpers)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//!
//! let loader = SettingsLoader::new(filesystem, parser, environment, clock, sinks);
//! let settings = loader.load(&LoadRequest::for_project("/srv/demo", "demo"))?;
//!
//! let tz: String = settings.get_as("tz")?;
//! settings.attach_structured_file_sink(Some("ingestion"))?;
//! ```

pub mod application;
pub mod domain;
pub mod error;

/// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        InitRequest, InitService, LoadRequest, Settings, SettingsLoader, SinkAttachment,
        ports::{Clock, EnvironmentSource, Filesystem, LayerParser, LogSinks},
    };
    pub use crate::domain::{FromValue, Layer, LayerOrigin, Setting, SettingsTable, Value};
    pub use crate::error::{StrataError, StrataResult};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
