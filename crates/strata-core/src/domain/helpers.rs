//! Constants and functions injected into template expressions.
//!
//! | Name             | Kind     | Value                                        |
//! |------------------|----------|----------------------------------------------|
//! | `now(zone?)`     | function | current time, fresh on every call            |
//! | `start_time(zone?)` | function | time the settings were loaded (fixed)     |
//! | `started_at`     | function | alias of `start_time`                        |
//! | `upper(s)`, `lower(s)` | function | case conversion                        |
//! | `date_partition` | constant | load date as `YYYY-MM-DD`                    |
//! | `base_dir`, `home_dir`, `project_name`, `env_prefix`, `env` | constant | supplied by the loader |
//!
//! Zones are IANA names (`"Asia/Kolkata"`); the default is UTC.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::domain::{clock::Clock, value::Value};

pub const BASE_DIR: &str = "base_dir";
pub const HOME_DIR: &str = "home_dir";
pub const PROJECT_NAME: &str = "project_name";
pub const ENV_PREFIX: &str = "env_prefix";
pub const ENVIRONMENT: &str = "env";
pub const DATE_PARTITION: &str = "date_partition";

const DATE_PARTITION_FORMAT: &str = "%Y-%m-%d";

/// Helper registry shared by every evaluation against one settings store.
#[derive(Clone)]
pub struct Helpers {
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
    constants: BTreeMap<String, Value>,
}

impl Helpers {
    /// Capture the start time from `clock` and derive the date partition.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        let mut constants = BTreeMap::new();
        constants.insert(
            DATE_PARTITION.to_owned(),
            Value::String(started_at.format(DATE_PARTITION_FORMAT).to_string()),
        );
        Self {
            clock,
            started_at,
            constants,
        }
    }

    /// Add or replace a named constant.
    pub fn with_constant(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.constants.insert(name.to_lowercase(), value.into());
        self
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    pub fn constants(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.constants.iter()
    }

    /// Invoke a helper by name. Constants accept no arguments.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        match name {
            "now" => Ok(Value::Datetime(localize(self.now(), zone_arg(name, args)?))),
            "start_time" | "started_at" => Ok(Value::Datetime(localize(
                self.started_at,
                zone_arg(name, args)?,
            ))),
            "upper" => string_arg(name, args).map(|s| Value::String(s.to_uppercase())),
            "lower" => string_arg(name, args).map(|s| Value::String(s.to_lowercase())),
            _ => match self.constants.get(name) {
                Some(value) if args.is_empty() => Ok(value.clone()),
                Some(_) => Err(format!("'{name}' is a constant and takes no arguments")),
                None => Err(format!("undefined helper '{name}'")),
            },
        }
    }
}

fn localize(at: DateTime<Utc>, zone: Tz) -> DateTime<chrono::FixedOffset> {
    at.with_timezone(&zone).fixed_offset()
}

fn zone_arg(helper: &str, args: &[Value]) -> Result<Tz, String> {
    match args {
        [] => Ok(Tz::UTC),
        [Value::String(name)] => name
            .parse::<Tz>()
            .map_err(|_| format!("unknown time zone '{name}'")),
        [other] => Err(format!(
            "{helper}() expects a zone name, got {}",
            other.type_name()
        )),
        _ => Err(format!("{helper}() takes at most one argument")),
    }
}

fn string_arg<'a>(helper: &str, args: &'a [Value]) -> Result<&'a str, String> {
    match args {
        [Value::String(s)] => Ok(s),
        [other] => Err(format!(
            "{helper}() expects a string, got {}",
            other.type_name()
        )),
        _ => Err(format!("{helper}() takes exactly one argument")),
    }
}
