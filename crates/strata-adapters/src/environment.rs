//! Process environment adapter.
//!
//! A snapshot of the process environment, optionally seeded from a `.env`
//! file. The snapshot is taken once; the real process environment is never
//! modified.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Environment, Source};

use strata_core::{
    application::{ApplicationError, ports::EnvironmentSource},
    error::StrataResult,
};

/// Separates the prefix from the key: `DEMO_TZ`.
const PREFIX_SEPARATOR: &str = "_";
/// Separates nested keys: `DEMO_DATABASE__HOST`.
const NESTING_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironment {
    vars: HashMap<String, String>,
}

impl ProcessEnvironment {
    /// Snapshot the process environment on top of the entries of `dotenv`.
    ///
    /// Process variables win over `.env` entries. A missing `.env` file is
    /// not an error; a malformed one is.
    pub fn capture(dotenv: Option<&Path>) -> StrataResult<Self> {
        let mut vars = HashMap::new();

        if let Some(path) = dotenv.filter(|p| p.is_file()) {
            let entries = dotenvy::from_path_iter(path).map_err(|e| dotenv_error(path, &e))?;
            for entry in entries {
                let (key, value) = entry.map_err(|e| dotenv_error(path, &e))?;
                vars.insert(key, value);
            }
            tracing::debug!(path = %path.display(), count = vars.len(), "Read .env file");
        }

        vars.extend(std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }));

        Ok(Self { vars })
    }

    /// An environment made only of `vars` (testing and embedding).
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn dotenv_error(path: &Path, e: &dotenvy::Error) -> ApplicationError {
    ApplicationError::ConfigLoad {
        path: path.to_path_buf(),
        reason: format!("invalid .env file: {e}"),
    }
}

impl EnvironmentSource for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn prefixed(&self, prefix: &str) -> StrataResult<Vec<(String, String)>> {
        let source = Environment::with_prefix(prefix)
            .prefix_separator(PREFIX_SEPARATOR)
            .separator(NESTING_SEPARATOR)
            .source(Some(
                self.vars
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ));

        let load_error = |reason: String| ApplicationError::ConfigLoad {
            path: PathBuf::from(format!("{prefix}{PREFIX_SEPARATOR}*")),
            reason,
        };

        let collected = source.collect().map_err(|e| load_error(e.to_string()))?;
        let mut overrides = Vec::with_capacity(collected.len());
        for (key, value) in collected {
            let raw = value.into_string().map_err(|e| load_error(e.to_string()))?;
            overrides.push((key, raw));
        }
        overrides.sort();
        Ok(overrides)
    }
}
