//! Settings layers and environment sections.
//!
//! A layer is one source of settings (a file, a secret file, or the process
//! environment). Its document is split into named environment sections; the
//! *view* of a layer for an active environment is `default`, then the
//! environment's own section, then `global`, deep-merged in that order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::{
    error::DomainError,
    setting::{Setting, SettingsTable},
};

pub const DEFAULT_SECTION: &str = "default";
pub const GLOBAL_SECTION: &str = "global";
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Where a layer came from. Declared in precedence order, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerOrigin {
    Preload,
    File,
    Secret,
    Environment,
}

impl fmt::Display for LayerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preload => write!(f, "preload"),
            Self::File => write!(f, "file"),
            Self::Secret => write!(f, "secret"),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// One named source of settings, split into environment sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    origin: LayerOrigin,
    path: Option<PathBuf>,
    sections: BTreeMap<String, SettingsTable>,
}

impl Layer {
    pub fn new(name: impl Into<String>, origin: LayerOrigin) -> Self {
        Self {
            name: name.into(),
            origin,
            path: None,
            sections: BTreeMap::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add (or merge into) an environment section.
    pub fn with_section(mut self, environment: &str, table: SettingsTable) -> Self {
        self.sections
            .entry(environment.to_lowercase())
            .or_default()
            .merge_from(&table);
        self
    }

    /// Build a layer from a parsed document whose top-level entries are
    /// environment sections.
    ///
    /// Fails if any top-level entry is not a table.
    pub fn from_document(
        name: impl Into<String>,
        origin: LayerOrigin,
        document: SettingsTable,
    ) -> Result<Self, DomainError> {
        let mut layer = Self::new(name, origin);
        for (section, node) in document {
            match node {
                Setting::Table(table) => layer = layer.with_section(&section, table),
                _ => {
                    return Err(DomainError::InvalidLayer {
                        layer: layer.name,
                        reason: format!(
                            "top-level key '{section}' is not an environment section \
                             (expected a table such as [{DEFAULT_SECTION}])"
                        ),
                    });
                }
            }
        }
        Ok(layer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn origin(&self) -> LayerOrigin {
        self.origin
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn section(&self, environment: &str) -> Option<&SettingsTable> {
        self.sections.get(&environment.to_lowercase())
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Merged view of this layer for the active environment.
    pub fn view(&self, environment: &str) -> SettingsTable {
        let environment = environment.to_lowercase();
        let mut view = SettingsTable::new();
        let order = [DEFAULT_SECTION, environment.as_str(), GLOBAL_SECTION];
        for (i, section) in order.iter().enumerate() {
            // Skip a repeat when the active environment is itself "default" or "global".
            if order[..i].contains(section) {
                continue;
            }
            if let Some(table) = self.sections.get(*section) {
                view.merge_from(table);
            }
        }
        view
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({}, {})", self.name, self.origin, path.display()),
            None => write!(f, "{} ({})", self.name, self.origin),
        }
    }
}
