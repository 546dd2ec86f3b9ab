//! Stored setting nodes and the case-insensitive settings table.
//!
//! A [`Setting`] is a value as it sits in a layer: either a literal or a
//! deferred [`Template`] that is only evaluated when read. Tables keep their
//! keys lower-cased so lookups are case-insensitive.

use std::collections::BTreeMap;

use crate::domain::{error::DomainError, template::Template, value::Value};

/// A stored, possibly-deferred setting.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    /// A scalar known at load time.
    Literal(Value),
    /// A template evaluated at read time.
    Deferred(Template),
    Array(Vec<Setting>),
    Table(SettingsTable),
}

impl Setting {
    /// Classify a raw string: marker-prefixed strings become templates,
    /// everything else stays literal.
    pub fn from_string(raw: String) -> Self {
        match Template::detect(&raw) {
            Some(template) => Self::Deferred(template),
            None => Self::Literal(Value::String(raw)),
        }
    }

    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub const fn as_table(&self) -> Option<&SettingsTable> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Value> for Setting {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::from_string(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Table(entries) => {
                let mut table = SettingsTable::new();
                for (k, v) in entries {
                    table.insert(&k, Self::from(v));
                }
                Self::Table(table)
            }
            scalar => Self::Literal(scalar),
        }
    }
}

impl From<SettingsTable> for Setting {
    fn from(table: SettingsTable) -> Self {
        Self::Table(table)
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Ordered mapping from lower-cased key to [`Setting`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsTable {
    entries: BTreeMap<String, Setting>,
}

impl SettingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single-segment key. The key is lower-cased.
    pub fn insert(&mut self, key: &str, setting: impl Into<Setting>) {
        self.entries.insert(key.to_lowercase(), setting.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: &str, setting: impl Into<Setting>) -> Self {
        self.insert(key, setting);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.entries.get(&key.to_lowercase())
    }

    /// Walk a normalized key path through nested tables.
    pub fn lookup(&self, path: &[String]) -> Option<&Setting> {
        let (first, rest) = path.split_first()?;
        let node = self.entries.get(first)?;
        if rest.is_empty() {
            return Some(node);
        }
        node.as_table()?.lookup(rest)
    }

    /// Set a value at a normalized key path, creating intermediate tables.
    ///
    /// A non-table node in the middle of the path is replaced by a table.
    pub fn set_path(&mut self, path: &[String], setting: Setting) {
        let Some((first, rest)) = path.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.entries.insert(first.clone(), setting);
            return;
        }
        let node = self
            .entries
            .entry(first.clone())
            .or_insert_with(|| Setting::Table(Self::new()));
        if !matches!(node, Setting::Table(_)) {
            *node = Setting::Table(Self::new());
        }
        if let Setting::Table(child) = node {
            child.set_path(rest, setting);
        }
    }

    /// Deep-merge `other` into `self`. Tables merge key by key; any other
    /// node from `other` replaces what was there.
    pub fn merge_from(&mut self, other: &Self) {
        for (key, incoming) in &other.entries {
            match (self.entries.get_mut(key), incoming) {
                (Some(Setting::Table(existing)), Setting::Table(next)) => existing.merge_from(next),
                _ => {
                    self.entries.insert(key.clone(), incoming.clone());
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Setting)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for SettingsTable {
    type Item = (String, Setting);
    type IntoIter = std::collections::btree_map::IntoIter<String, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Split a user-supplied key into lower-cased path segments.
///
/// `"Database.Host"` becomes `["database", "host"]`. Empty segments are
/// rejected.
pub fn normalize_key(key: &str) -> Result<Vec<String>, DomainError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidKey {
            key: key.to_owned(),
            reason: "key is empty".into(),
        });
    }
    trimmed
        .split('.')
        .map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                Err(DomainError::InvalidKey {
                    key: key.to_owned(),
                    reason: "empty path segment".into(),
                })
            } else {
                Ok(segment.to_lowercase())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(key: &str) -> Vec<String> {
        normalize_key(key).unwrap()
    }

    #[test]
    fn keys_are_case_insensitive() {
        let table = SettingsTable::new().with("TZ", Value::from("UTC"));
        assert!(table.get("tz").is_some());
        assert!(table.lookup(&path("Tz")).is_some());
    }

    #[test]
    fn normalize_rejects_empty_segments() {
        assert!(normalize_key("").is_err());
        assert!(normalize_key("a..b").is_err());
        assert_eq!(path(" Database.HOST "), vec!["database", "host"]);
    }

    #[test]
    fn set_path_creates_intermediate_tables() {
        let mut table = SettingsTable::new();
        table.set_path(&path("database.host"), Value::from("db").into());
        let host = table.lookup(&path("database.host"));
        assert_eq!(host, Some(&Setting::Literal(Value::from("db"))));
    }

    #[test]
    fn set_path_replaces_scalar_parent() {
        let mut table = SettingsTable::new().with("database", Value::from("sqlite"));
        table.set_path(&path("database.port"), Value::from(5432).into());
        assert!(table.get("database").and_then(Setting::as_table).is_some());
    }

    #[test]
    fn merge_is_deep_for_tables() {
        let mut base = SettingsTable::new().with(
            "database",
            SettingsTable::new()
                .with("host", Value::from("localhost"))
                .with("port", Value::from(5432)),
        );
        let overlay = SettingsTable::new().with(
            "database",
            SettingsTable::new().with("host", Value::from("prod-db")),
        );
        base.merge_from(&overlay);

        assert_eq!(
            base.lookup(&path("database.host")),
            Some(&Setting::Literal(Value::from("prod-db")))
        );
        assert_eq!(
            base.lookup(&path("database.port")),
            Some(&Setting::Literal(Value::from(5432)))
        );
    }

    #[test]
    fn merge_replaces_non_tables() {
        let mut base = SettingsTable::new().with("tz", Value::from("Asia/Kolkata"));
        base.merge_from(&SettingsTable::new().with("tz", Value::from("UTC")));
        assert_eq!(base.get("tz"), Some(&Setting::Literal(Value::from("UTC"))));
    }

    #[test]
    fn marker_strings_become_deferred() {
        assert!(Setting::from_string("@format {base_dir}/logs".into()).is_deferred());
        assert!(!Setting::from_string("plain".into()).is_deferred());
    }
}
