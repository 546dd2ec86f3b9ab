//! Resolved setting values.
//!
//! A [`Value`] is what callers get back from a lookup: every template has
//! already been evaluated. Stored, possibly-deferred nodes are
//! [`Setting`](super::setting::Setting)s.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;

/// A fully resolved setting value.
///
/// Serializes untagged, so JSON output reads like the source document
/// (timestamps become RFC 3339 strings).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Datetime(DateTime<FixedOffset>),
    Array(Vec<Value>),
    Table(BTreeMap<String, Value>),
}

impl Value {
    /// Human name of the variant, used in type-mismatch messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "a string",
            Self::Integer(_) => "an integer",
            Self::Float(_) => "a float",
            Self::Boolean(_) => "a boolean",
            Self::Datetime(_) => "a timestamp",
            Self::Array(_) => "an array",
            Self::Table(_) => "a table",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Datetime(dt) => Some(dt),
            _ => None,
        }
    }

    pub const fn as_table(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Inline rendering used inside arrays and tables, where strings need
    /// quoting to stay unambiguous.
    fn fmt_inline(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Datetime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_inline(f)?;
                }
                f.write_str("]")
            }
            Self::Table(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {k} = ")?;
                    v.fmt_inline(f)?;
                }
                if !entries.is_empty() {
                    f.write_str(" ")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Datetime(dt)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Self::String(p.display().to_string())
    }
}

// ── Typed extraction ─────────────────────────────────────────────────────────

/// Conversion from a resolved [`Value`] into a concrete Rust type.
///
/// Used by `Settings::get_as`. Returns the value back on mismatch so the
/// caller can report what was actually found.
pub trait FromValue: Sized {
    /// Description of the accepted variant, e.g. "a string".
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Result<Self, Value>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any value";

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(other),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "a number";

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Integer(i) => Ok(i as f64),
            other => Err(other),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromValue for PathBuf {
    const EXPECTED: &'static str = "a path string";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::String(s) => Ok(PathBuf::from(s)),
            other => Err(other),
        }
    }
}

impl FromValue for DateTime<FixedOffset> {
    const EXPECTED: &'static str = "a timestamp";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Datetime(dt) => Ok(dt),
            Value::String(s) => DateTime::parse_from_rfc3339(&s).map_err(|_| Value::String(s)),
            other => Err(other),
        }
    }
}
