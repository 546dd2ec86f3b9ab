//! Application configuration.
//!
//! [`AppConfig`] is resolved once at startup from the global flags and passed
//! down by reference.  It only says *where* settings live; resolving them is
//! the loader's job.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags
//! 2. Conventions relative to the project directory
//!
//! `ENV_FOR_<PREFIX>` and `SECRETS_FOR_<PREFIX>` are read by the loader, not
//! here, so that `.env` entries apply to them too.

use std::path::{Path, PathBuf};

use strata_core::application::{
    LoadRequest, env_prefix_for,
    services::{PRELOAD_FILE_NAME, SETTINGS_DIR_NAME},
};

use crate::{
    cli::global::GlobalArgs,
    error::{CliError, CliResult},
};

/// Name of the optional environment seed file in the project directory.
pub const DOTENV_FILE_NAME: &str = ".env";
/// Used when the project directory has no usable name.
const FALLBACK_PROJECT_NAME: &str = "strata";

/// Where the settings for one invocation live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub project_dir: PathBuf,
    pub project_name: String,
    pub settings_dir: PathBuf,
    pub preload: PathBuf,
    pub env_prefix: String,
    pub environment: Option<String>,
    pub secrets_dir: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
    pub dotenv: PathBuf,
    /// `Some(suffix)` when a structured log sink was requested.
    pub log_sink: Option<Option<String>>,
}

impl AppConfig {
    /// Resolve configuration from flags and the current directory.
    pub fn resolve(args: &GlobalArgs) -> CliResult<Self> {
        let cwd = std::env::current_dir().map_err(|e| CliError::ConfigError {
            message: "cannot determine the current directory".into(),
            source: Some(Box::new(e)),
        })?;
        Self::resolve_in(args, &cwd)
    }

    /// Resolve with relative paths taken against `cwd`.
    pub fn resolve_in(args: &GlobalArgs, cwd: &Path) -> CliResult<Self> {
        let project_dir = absolute(&cwd.join(args.project_dir.as_deref().unwrap_or(Path::new("."))))?;

        let project_name = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_PROJECT_NAME.to_owned());

        let settings_dir = args
            .settings_dir
            .as_ref()
            .map_or_else(|| project_dir.join(SETTINGS_DIR_NAME), |d| project_dir.join(d));
        let preload = args
            .preload
            .as_ref()
            .map_or_else(|| settings_dir.join(PRELOAD_FILE_NAME), |p| project_dir.join(p));

        let env_prefix = match args.prefix.as_deref().map(str::trim) {
            Some("") => {
                return Err(CliError::InvalidInput {
                    message: "--prefix must not be empty".into(),
                    source: None,
                });
            }
            Some(prefix) => prefix.to_uppercase(),
            None => env_prefix_for(&project_name),
        };

        let home_dir = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

        Ok(Self {
            dotenv: project_dir.join(DOTENV_FILE_NAME),
            secrets_dir: args.secrets_dir.as_ref().map(|d| project_dir.join(d)),
            environment: args.env.clone(),
            log_sink: args.log_sink.clone(),
            project_dir,
            project_name,
            settings_dir,
            preload,
            env_prefix,
            home_dir,
        })
    }

    /// The loader request for this configuration.
    pub fn load_request(&self) -> LoadRequest {
        let mut request = LoadRequest::for_project(&self.project_dir, &self.project_name)
            .with_layer_dir(&self.settings_dir)
            .with_preload(&self.preload)
            .with_env_prefix(&self.env_prefix);
        if let Some(dir) = &self.secrets_dir {
            request = request.with_secrets_dir(dir);
        }
        if let Some(env) = &self.environment {
            request = request.with_environment(env);
        }
        if let Some(home) = &self.home_dir {
            request = request.with_home_dir(home);
        }
        request
    }
}

fn absolute(path: &Path) -> CliResult<PathBuf> {
    std::path::absolute(path).map_err(|e| CliError::ConfigError {
        message: format!("cannot resolve '{}'", path.display()),
        source: Some(Box::new(e)),
    })
}
