//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "load settings" or "write a settings skeleton".

pub mod init_service;
pub mod settings_loader;

pub use init_service::{InitReport, InitRequest, InitService};
pub use settings_loader::{
    Injected, LoadRequest, PRELOAD_FILE_NAME, SETTINGS_DIR_NAME, SettingsLoader, env_prefix_for,
};
